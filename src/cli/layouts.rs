use usage_report::{Config, LayoutRegistry};

use super::terminal::Colorize;

pub struct Layouts;

impl Layouts {
    /// Prints every registered layout, marking the configured one.
    pub fn run(config: &Config) {
        let registry = LayoutRegistry::default();
        for name in registry.names() {
            if name == config.layout() {
                println!("{name} {}", "(default)".dim());
            } else {
                println!("{name}");
            }
        }
    }
}
