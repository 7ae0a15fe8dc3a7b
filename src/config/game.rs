use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upper bound on retained undo snapshots.
pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_save_directory")]
    pub save_directory: String,
    #[serde(default = "default_autosave")]
    pub autosave: bool,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// RNG seed for weather and sowing. 0 draws a seed from entropy.
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Optional TOML file with extra plant definitions.
    #[serde(default)]
    pub plant_definitions: Option<String>,
    #[serde(default = "default_scenario")]
    pub default_scenario: String,
}

fn default_save_directory() -> String {
    "./saves".to_string()
}
fn default_autosave() -> bool {
    true
}
fn default_history_limit() -> usize {
    MAX_HISTORY_LIMIT
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_scenario() -> String {
    "easy_start".to_string()
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            save_directory: default_save_directory(),
            autosave: default_autosave(),
            history_limit: default_history_limit(),
            seed: 0,
            log_level: default_log_level(),
            plant_definitions: None,
            default_scenario: default_scenario(),
        }
    }
}

impl GameConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    /// Like `from_file`, but a missing file yields the defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self, String> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: GameConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_dir(&self) -> PathBuf {
        PathBuf::from(&self.save_directory)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if self.save_directory.trim().is_empty() {
            errors.push(
                "save_directory must not be empty. Example: save_directory = \"./saves\""
                    .to_string(),
            );
        }

        if !(1..=MAX_HISTORY_LIMIT).contains(&self.history_limit) {
            errors.push(format!(
                "history_limit must be 1-{}, got {}. Example: history_limit = 100",
                MAX_HISTORY_LIMIT, self.history_limit
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            errors.push(format!(
                "log_level must be one of {:?}, got '{}'. Example: log_level = \"warn\"",
                valid_levels, self.log_level
            ));
        }

        if self.default_scenario.trim().is_empty() {
            errors.push(
                "default_scenario must not be empty. Example: default_scenario = \"easy_start\""
                    .to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn test_path() -> PathBuf {
        PathBuf::from("test-farmgrid.toml")
    }

    #[test]
    fn valid_config_loads_all_fields() {
        let toml = r#"
            save_directory = "/tmp/farm-saves"
            autosave = false
            history_limit = 25
            seed = 1234
            log_level = "debug"
            plant_definitions = "plants.toml"
            default_scenario = "drought_challenge"
        "#;
        let config = GameConfig::from_toml_str(toml, &test_path()).unwrap();
        assert_eq!(config.save_directory, "/tmp/farm-saves");
        assert!(!config.autosave);
        assert_eq!(config.history_limit, 25);
        assert_eq!(config.seed, 1234);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.plant_definitions.as_deref(), Some("plants.toml"));
        assert_eq!(config.default_scenario, "drought_challenge");
    }

    #[test]
    fn defaults_applied_for_empty_config() {
        let config = GameConfig::from_toml_str("", &test_path()).unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.save_directory, "./saves");
        assert!(config.autosave);
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.seed, 0);
        assert_eq!(config.log_level, "warn");
        assert!(config.plant_definitions.is_none());
        assert_eq!(config.default_scenario, "easy_start");
    }

    #[test]
    fn history_limit_out_of_range_rejected() {
        for bad in ["history_limit = 0", "history_limit = 101"] {
            let err = GameConfig::from_toml_str(bad, &test_path()).unwrap_err();
            assert!(err.contains("history_limit"));
            assert!(err.contains("1-100"));
        }
    }

    #[test]
    fn invalid_log_level_rejected() {
        let err =
            GameConfig::from_toml_str(r#"log_level = "loud""#, &test_path()).unwrap_err();
        assert!(err.contains("log_level"));
    }

    #[test]
    fn multiple_errors_reported_together() {
        let toml = "history_limit = 0\nsave_directory = \"\"\nlog_level = \"x\"";
        let err = GameConfig::from_toml_str(toml, &test_path()).unwrap_err();
        assert!(err.contains("history_limit"));
        assert!(err.contains("save_directory"));
        assert!(err.contains("log_level"));
        assert_eq!(err.lines().count(), 3);
    }

    #[test]
    fn malformed_toml_includes_source_path() {
        let err = GameConfig::from_toml_str("seed = [", &test_path()).unwrap_err();
        assert!(err.contains("test-farmgrid.toml"));
    }

    #[test]
    fn from_file_loads_valid_config() {
        let mut tmp = NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(tmp, "seed = 99").unwrap();
        let config = GameConfig::from_file(tmp.path()).unwrap();
        assert_eq!(config.seed, 99);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = Path::new("/nonexistent/farmgrid.toml");
        assert!(GameConfig::from_file(path).unwrap_err().contains("Cannot read"));
        assert_eq!(GameConfig::from_file_or_default(path).unwrap(), GameConfig::default());
    }
}
