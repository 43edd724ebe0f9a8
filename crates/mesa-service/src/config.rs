//! # Service Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MESA_DB_PATH=/var/lib/mesa/mesa.db                                 │
//! │     MESA_OPERATOR=Caixa 1                                              │
//! │     MESA_DEFAULT_CAPACITY=6                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $MESA_CONFIG, or                                                   │
//! │     ~/.config/pos/mesa.toml (Linux)                                    │
//! │     ~/Library/Application Support/com.mesa.pos/mesa.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/mesa/mesa.db"
//! max_connections = 5
//!
//! [service]
//! default_operator = "Sistema"
//! default_capacity = 4
//! default_location = "Área Principal"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use mesa_core::{DEFAULT_OPERATOR_NAME, MAX_TABLE_CAPACITY};
use mesa_db::DbConfig;

use crate::error::ConfigError;
use crate::tables::{TableDefaults, DEFAULT_CAPACITY, DEFAULT_LOCATION};

const CONFIG_FILE_NAME: &str = "mesa.toml";
const DB_FILE_NAME: &str = "mesa.db";

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. `:memory:` keeps everything in memory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "mesa", "pos")
        .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Service Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Operator recorded on a sale when the waiter leaves it blank.
    #[serde(default = "default_operator")]
    pub default_operator: String,

    /// Seats given to new tables.
    #[serde(default = "default_capacity")]
    pub default_capacity: i64,

    /// Area given to new tables.
    #[serde(default = "default_location")]
    pub default_location: String,
}

fn default_operator() -> String {
    DEFAULT_OPERATOR_NAME.to_string()
}

fn default_capacity() -> i64 {
    DEFAULT_CAPACITY
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            default_operator: default_operator(),
            default_capacity: default_capacity(),
            default_location: default_location(),
        }
    }
}

impl ServiceSettings {
    pub fn table_defaults(&self) -> TableDefaults {
        TableDefaults {
            capacity: self.default_capacity,
            location: self.default_location.clone(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MesaConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub service: ServiceSettings,
}

impl MesaConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else `$MESA_CONFIG`, else the platform config dir)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if !(1..=MAX_TABLE_CAPACITY).contains(&self.service.default_capacity) {
            return Err(ConfigError::Invalid(format!(
                "service.default_capacity must be between 1 and {MAX_TABLE_CAPACITY}"
            )));
        }

        if self.service.default_operator.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "service.default_operator must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Connection settings for [`mesa_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        if self.database.path.as_os_str() == ":memory:" {
            return DbConfig::in_memory();
        }
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("MESA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(operator) = var("MESA_OPERATOR") {
            self.service.default_operator = operator;
        }

        if let Some(capacity) = var("MESA_DEFAULT_CAPACITY") {
            match capacity.parse::<i64>() {
                Ok(c) => self.service.default_capacity = c,
                Err(_) => warn!(value = %capacity, "Ignoring non-numeric MESA_DEFAULT_CAPACITY"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("MESA_CONFIG") {
            return Some(PathBuf::from(path));
        }
        directories::ProjectDirs::from("com", "mesa", "pos")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = MesaConfig::default();
        assert_eq!(config.service.default_operator, "Sistema");
        assert_eq!(config.service.default_capacity, 4);
        assert_eq!(config.service.default_location, "Área Principal");
        assert_eq!(config.database.max_connections, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: MesaConfig = toml::from_str(
            r#"
            [service]
            default_capacity = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.service.default_capacity, 6);
        assert_eq!(config.service.default_operator, "Sistema");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MESA_DB_PATH", "/tmp/mesa-test.db"),
            ("MESA_OPERATOR", "Caixa 1"),
            ("MESA_DEFAULT_CAPACITY", "8"),
        ]
        .into_iter()
        .collect();

        let mut config = MesaConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/mesa-test.db"));
        assert_eq!(config.service.default_operator, "Caixa 1");
        assert_eq!(config.service.default_capacity, 8);
    }

    #[test]
    fn test_bad_capacity_override_is_ignored() {
        let mut config = MesaConfig::default();
        config.apply_overrides(|k| (k == "MESA_DEFAULT_CAPACITY").then(|| "many".to_string()));
        assert_eq!(config.service.default_capacity, 4);
    }

    #[test]
    fn test_validation() {
        let mut config = MesaConfig::default();
        config.service.default_capacity = 0;
        assert!(config.validate().is_err());

        config.service.default_capacity = 4;
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 1;
        config.service.default_operator = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("mesa-{}.toml", uuid::Uuid::new_v4()));

        let mut config = MesaConfig::default();
        config.database.path = PathBuf::from(":memory:");
        config.service.default_location = "Varanda".to_string();
        config.save(Some(path.clone())).unwrap();

        let loaded = MesaConfig::load(Some(path.clone())).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.service.default_location, "Varanda");
        assert!(loaded.db_config().is_in_memory());
    }

    #[test]
    fn test_db_config_from_settings() {
        let mut config = MesaConfig::default();
        config.database.path = PathBuf::from("/tmp/x.db");
        config.database.max_connections = 3;

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(db.max_connections, 3);
    }
}
