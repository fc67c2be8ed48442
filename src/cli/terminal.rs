//! Terminal capability detection and colouring

use std::fmt;

use owo_colors::{OwoColorize, Style, colors::css};

fn colours_enabled() -> bool {
    supports_color::on_cached(supports_color::Stream::Stdout).is_some()
}

/// Width of the terminal stdout is attached to, if any
pub fn terminal_width() -> Option<usize> {
    terminal_size::terminal_size().map(|(width, _)| usize::from(width.0))
}

/// Semantic colours for command output. Falls back to plain text when the
/// terminal does not support colour.
pub trait Colorize: fmt::Display {
    /// Renders with `style` if colours are enabled
    fn paint(&self, style: Style) -> String {
        if colours_enabled() {
            self.style(style).to_string()
        } else {
            self.to_string()
        }
    }

    /// Color as success (green)
    fn success(&self) -> String {
        self.paint(Style::new().fg::<css::Green>())
    }

    /// Color as warning (amber)
    fn warning(&self) -> String {
        self.paint(Style::new().fg::<css::Orange>())
    }

    /// Color as info (blue)
    fn info(&self) -> String {
        self.paint(Style::new().fg::<css::LightBlue>())
    }

    /// Dim the text
    fn dim(&self) -> String {
        self.paint(Style::new().dimmed())
    }
}

impl<T: fmt::Display + ?Sized> Colorize for T {}
