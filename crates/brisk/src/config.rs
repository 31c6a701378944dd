//! Engine configuration

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings for an [`Engine`](crate::host::Engine) and the interpreters it
/// runs. Missing keys in a config file take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory scripts are resolved against.
    pub root_dir: Option<PathBuf>,

    /// Extra directories searched for component definitions.
    pub component_dirs: Vec<PathBuf>,

    /// Call depth at which a program fails with a stack overflow.
    pub max_call_depth: usize,

    /// Initial size of each shared buffer, header included.
    pub shared_buffer_initial: usize,

    /// Size shared buffers may grow to.
    pub shared_buffer_max: usize,

    /// Forward warnings to the host.
    pub dev_mode: bool,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log every executed statement at debug level.
    pub trace: bool,

    /// Preprocessor constants, manifest style: `"debug=true;beta=false"`.
    pub bs_const: String,

    /// Functions tried, in order, as the program entry point.
    pub entry_points: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            component_dirs: Vec::new(),
            max_call_depth: 1000,
            shared_buffer_initial: 32 * 1024,
            shared_buffer_max: 3 * 1024 * 1024,
            dev_mode: false,
            log_level: "warn".to_string(),
            trace: false,
            bs_const: String::new(),
            entry_points: vec!["main".to_string(), "runuserinterface".to_string()],
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(dir.into());
        self
    }

    pub fn with_component_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.component_dirs.push(dir.into());
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_shared_buffer(mut self, initial: usize, max: usize) -> Self {
        self.shared_buffer_initial = initial;
        self.shared_buffer_max = max;
        self
    }

    pub fn with_dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = enabled;
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    pub fn with_const(mut self, name: &str, value: bool) -> Self {
        if !self.bs_const.is_empty() {
            self.bs_const.push(';');
        }
        self.bs_const.push_str(&format!("{name}={value}"));
        self
    }

    /// The preprocessor symbol table from `bs_const`. Names are
    /// case-insensitive; entries that are not `name=true|false` are skipped.
    pub fn constants(&self) -> HashMap<String, bool> {
        self.bs_const
            .split(';')
            .filter_map(|entry| {
                let (name, value) = entry.split_once('=')?;
                let value = match value.trim().to_ascii_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => return None,
                };
                Some((name.trim().to_lowercase(), value))
            })
            .filter(|(name, _)| !name.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_call_depth, 1000);
        assert_eq!(config.shared_buffer_initial, 32768);
        assert_eq!(config.entry_points, vec!["main", "runuserinterface"]);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_call_depth": 50, "dev_mode": true}"#).unwrap();
        assert_eq!(config.max_call_depth, 50);
        assert!(config.dev_mode);
        assert!(!config.trace);
        assert_eq!(config.shared_buffer_max, 3 * 1024 * 1024);
    }

    #[test]
    fn test_constants() {
        let config = EngineConfig::default().with_const("Debug", true).with_const("beta", false);
        let constants = config.constants();
        assert_eq!(constants.get("debug"), Some(&true));
        assert_eq!(constants.get("beta"), Some(&false));

        let config = EngineConfig {
            bs_const: "a=maybe; b = TRUE ;=true".to_string(),
            ..EngineConfig::default()
        };
        let constants = config.constants();
        assert_eq!(constants.len(), 1);
        assert_eq!(constants.get("b"), Some(&true));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::from_file("/nonexistent/brisk.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
