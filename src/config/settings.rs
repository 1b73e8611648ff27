use crate::communication::registry::CommandRegistry;
use crate::utils::error_handling::{ProtoError, ProtoResult};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "AGENT_PROTO_CONFIG";

/// Start-up settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: String,
    /// Replaces the built-in command table when present
    pub commands: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            log_level: "info".to_string(),
            commands: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> ProtoResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ProtoError::config(&format!("Failed to read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            ProtoError::config(&format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load from the file named by `AGENT_PROTO_CONFIG`, defaults when unset
    pub fn from_env() -> ProtoResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Build the command registry for this process
    pub fn registry(&self) -> CommandRegistry {
        match &self.commands {
            Some(table) => CommandRegistry::from_table(table.clone()),
            None => CommandRegistry::default(),
        }
    }

    pub fn log_filter(&self) -> ProtoResult<LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| ProtoError::config(&format!("Unknown log level: {}", self.log_level)))
    }
}
