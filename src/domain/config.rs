use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default line width at which long location labels are wrapped.
pub const DEFAULT_LINE_WRAP_LIMIT: usize = 200;

/// Default id of the unit modelling the execution environment.
pub const DEFAULT_SYNTHETIC_UNIT_ID: &str = "a.jre.javase";

/// Settings for generating usage reports.
///
/// Command line flags override these values for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Name of the layout used to render reports.
    layout: String,

    /// Column at which location labels are wrapped.
    ///
    /// When unset, the terminal width is used if standard output is a
    /// terminal, otherwise [`DEFAULT_LINE_WRAP_LIMIT`].
    line_wrap_limit: Option<usize>,

    /// Id of the synthetic execution-environment unit that is ignored when
    /// deciding whether a unit is used through its requirements.
    synthetic_unit_id: String,

    /// Whether reports list the consuming projects by default.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: default_layout(),
            line_wrap_limit: None,
            synthetic_unit_id: default_synthetic_unit_id(),
            verbose: false,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Loads the configuration at `path`, falling back to the defaults if the
    /// file is missing or invalid.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::debug!("Failed to load config file, using defaults: {e}");
            Self::default()
        })
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the configured layout name.
    #[must_use]
    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Sets the layout name.
    pub fn set_layout(&mut self, layout: impl Into<String>) {
        self.layout = layout.into();
    }

    /// Returns the configured wrap limit, if any.
    #[must_use]
    pub const fn line_wrap_limit(&self) -> Option<usize> {
        self.line_wrap_limit
    }

    /// Sets the wrap limit.
    pub const fn set_line_wrap_limit(&mut self, limit: usize) {
        self.line_wrap_limit = Some(limit);
    }

    /// Returns the id of the synthetic execution-environment unit.
    #[must_use]
    pub fn synthetic_unit_id(&self) -> &str {
        &self.synthetic_unit_id
    }
}

fn default_layout() -> String {
    "tree".to_string()
}

fn default_synthetic_unit_id() -> String {
    DEFAULT_SYNTHETIC_UNIT_ID.to_string()
}

/// On-disk forms of the configuration, tagged by `_version`. Older files keep
/// loading when a new form is added.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_layout")]
        layout: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        line_wrap_limit: Option<usize>,

        #[serde(default = "default_synthetic_unit_id")]
        synthetic_unit_id: String,

        #[serde(default)]
        verbose: bool,
    },
}

impl From<Versions> for super::Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                layout,
                line_wrap_limit,
                synthetic_unit_id,
                verbose,
            } => Self {
                layout,
                line_wrap_limit,
                synthetic_unit_id,
                verbose,
            },
        }
    }
}

impl From<super::Config> for Versions {
    fn from(config: super::Config) -> Self {
        Self::V1 {
            layout: config.layout,
            line_wrap_limit: config.line_wrap_limit,
            synthetic_unit_id: config.synthetic_unit_id,
            verbose: config.verbose,
        }
    }
}
