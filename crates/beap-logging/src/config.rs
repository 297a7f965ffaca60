//! Logging configuration
//!
//! All sections deserialize with defaults, so a host can ship a partial
//! JSON document such as `{"default_level": "debug"}`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Crates of the package builder, in pipeline order
pub const BUILDER_TARGETS: [&str; 3] = ["beap_package", "beap_crypto", "beap_core"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for everything without a target override; `RUST_LOG` wins over it
    pub default_level: String,
    pub console: ConsoleConfig,
    /// Rolling JSONL file, disabled when absent
    pub file: Option<FileConfig>,
    pub jsonl: JsonlConfig,
    /// Per-target level overrides, e.g. `beap_package = "trace"`
    pub targets: BTreeMap<String, String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
            targets: BTreeMap::new(),
        }
    }
}

impl LogConfig {
    /// Human-readable console output with the builder crates at `debug`
    pub fn development() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: true,
            },
            ..Default::default()
        }
        .with_builder_level("debug")
    }

    /// JSONL into daily files under `log_dir`, console off
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            console: ConsoleConfig {
                enabled: false,
                ..ConsoleConfig::default()
            },
            file: Some(FileConfig {
                directory: log_dir,
                max_files: Some(30),
                ..FileConfig::default()
            }),
            ..Default::default()
        }
    }

    /// Warnings only, plain console lines
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            ..Default::default()
        }
    }

    /// Override the level of one target
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.targets.insert(target.into(), level.into());
        self
    }

    /// Set the same level on every builder crate
    pub fn with_builder_level(self, level: &str) -> Self {
        BUILDER_TARGETS
            .iter()
            .fold(self, |config, target| config.with_target(*target, level))
    }

    /// `EnvFilter` directives: `default,target=level,...`
    pub fn filter_directives(&self) -> String {
        std::iter::once(self.default_level.clone())
            .chain(
                self.targets
                    .iter()
                    .map(|(target, level)| format!("{}={}", target, level)),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Pretty lines instead of JSONL
    pub pretty: bool,
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: false,
            ansi: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// Files are named `<prefix>.<date>.jsonl`
    pub prefix: String,
    pub rotation: RotationStrategy,
    /// Rotated files kept on disk; unlimited when absent
    pub max_files: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "beap-builder".to_string(),
            rotation: RotationStrategy::Daily,
            max_files: Some(7),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// Single file, never rotated
    Never,
}

/// Shape of JSONL records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Put event fields at the top level instead of under `fields`
    pub flatten_events: bool,
    /// Emit the list of entered spans (carries `build_id`)
    pub include_spans: bool,
    pub include_thread_info: bool,
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_thread_info: false,
            include_location: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_jsonl_console() {
        let config = LogConfig::default();
        assert_eq!(config.default_level, "info");
        assert!(config.console.enabled);
        assert!(!config.console.pretty);
        assert!(config.file.is_none());
        assert_eq!(config.filter_directives(), "info");
    }

    #[test]
    fn test_development_raises_builder_crates() {
        let config = LogConfig::development();
        assert!(config.console.pretty);
        assert_eq!(
            config.filter_directives(),
            "info,beap_core=debug,beap_crypto=debug,beap_package=debug"
        );
    }

    #[test]
    fn test_production_writes_files_only() {
        let config = LogConfig::production(PathBuf::from("/var/log/beap"));
        assert!(!config.console.enabled);
        let file = config.file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/var/log/beap"));
        assert_eq!(file.prefix, "beap-builder");
        assert_eq!(file.max_files, Some(30));
    }

    #[test]
    fn test_target_override() {
        let config = LogConfig::testing().with_target("beap_package", "trace");
        assert_eq!(config.filter_directives(), "warn,beap_package=trace");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LogConfig = serde_json::from_str(
            r#"{"default_level":"debug","file":{"rotation":"hourly"}}"#,
        )
        .unwrap();
        assert_eq!(config.default_level, "debug");
        assert!(config.console.enabled);
        assert!(config.jsonl.flatten_events);
        let file = config.file.unwrap();
        assert_eq!(file.rotation, RotationStrategy::Hourly);
        assert_eq!(file.prefix, "beap-builder");
    }
}
