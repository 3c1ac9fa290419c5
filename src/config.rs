use crate::errors::{PurgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable consulted for the build mode
pub const MODE_ENV_VAR: &str = "NODE_ENV";

/// Deployment mode. Only production runs the pruning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    /// Interpret a mode flag value. Only `production` selects production.
    pub fn from_flag(value: &str) -> Self {
        if value.trim() == "production" {
            Self::Production
        } else {
            Self::Development
        }
    }

    /// Read the mode from `NODE_ENV`, defaulting to development
    pub fn from_env() -> Self {
        std::env::var(MODE_ENV_VAR)
            .map(|value| Self::from_flag(&value))
            .unwrap_or_default()
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Content paths to scan for tokens
    pub content: Vec<String>,

    /// Token extractors by file extension
    pub extractors: Vec<ExtractorRule>,

    /// Utility class generation
    pub utilities: UtilitiesConfig,

    /// External CSS plugins, run in order after utility generation
    pub plugins: Vec<PluginConfig>,

    /// Production-only pruning stage
    pub purge: PurgeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            content: vec!["**/*.elm".to_string(), "**/*.pug".to_string()],
            extractors: vec![ExtractorRule::default()],
            utilities: UtilitiesConfig::default(),
            plugins: Vec::new(),
            purge: PurgeConfig::default(),
        }
    }
}

/// Extractor selection for a set of file extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorRule {
    /// File extensions, with or without the leading dot
    pub extensions: Vec<String>,

    /// Regular expression whose matches are tokens. The built-in scanner is
    /// used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Default for ExtractorRule {
    fn default() -> Self {
        Self {
            extensions: vec!["elm".to_string(), "pug".to_string()],
            pattern: None,
        }
    }
}

/// Utility class generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilitiesConfig {
    /// Emit the preflight/reset CSS
    pub preflight: bool,
}

impl Default for UtilitiesConfig {
    fn default() -> Self {
        Self { preflight: true }
    }
}

/// An external CSS transformation: CSS on stdin, CSS on stdout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Display name (e.g. `autoprefixer`)
    pub name: String,

    /// Program followed by its arguments
    pub command: Vec<String>,

    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Pruning stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeConfig {
    /// Program followed by its arguments. `{keep_list}` is replaced with the
    /// keep-list path.
    pub command: Vec<String>,

    /// Where the keep-list manifest is written before the command runs
    pub keep_list: PathBuf,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            keep_list: PathBuf::from("keep-list.json"),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = read_config(path)?;
        serde_yaml::from_str(&content).map_err(|e| PurgeError::ConfigError {
            message: format!("Failed to parse YAML config: {}", e),
        })
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = read_config(path)?;
        serde_json::from_str(&content).map_err(|e| PurgeError::ConfigError {
            message: format!("Failed to parse JSON config: {}", e),
        })
    }

    /// Load configuration from a file (auto-detect format)
    pub fn from_file(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(PurgeError::ConfigError {
                message: format!(
                    "Unsupported config file format: {}. Use .yaml, .yml, or .json",
                    path.display()
                ),
            }),
        }
    }

    /// Merge with another configuration
    pub fn merge(mut self, other: Self) -> Self {
        for path in other.content {
            if !self.content.contains(&path) {
                self.content.push(path);
            }
        }

        // Appended rules override earlier ones for the same extension
        self.extractors.extend(other.extractors);
        self.plugins.extend(other.plugins);

        if !other.utilities.preflight {
            self.utilities.preflight = false;
        }
        if !other.purge.command.is_empty() {
            self.purge = other.purge;
        }

        self
    }

    /// Check the configuration against a build mode
    pub fn validate(&self, mode: BuildMode) -> Result<()> {
        for plugin in self.plugins.iter().filter(|p| p.enabled) {
            if plugin.command.is_empty() {
                return Err(PurgeError::ConfigError {
                    message: format!("Plugin '{}' has an empty command", plugin.name),
                });
            }
        }

        if mode.is_production() && self.purge.command.is_empty() {
            return Err(PurgeError::ConfigError {
                message: "Production builds require a purge command".to_string(),
            });
        }

        Ok(())
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| PurgeError::ConfigError {
        message: format!("Failed to read config file {}: {}", path.display(), e),
    })
}
