//! Server configuration

use onbehalf_core::StaffRoster;
use onbehalf_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Holds `audit/ledger.jsonl` and `state.db`
    pub data_dir: PathBuf,
    /// Optional JSON file with [`EngineConfig`] overrides
    pub engine_config: Option<PathBuf>,
    /// Optional JSON roster of `{id, name, role}`
    pub staff_roster: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            engine_config: None,
            staff_roster: None,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `ONBEHALF_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("ONBEHALF_HOST").unwrap_or(defaults.host),
            port: env::var("ONBEHALF_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            data_dir: env::var("ONBEHALF_DATA")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            engine_config: env::var("ONBEHALF_ENGINE_CONFIG").ok().map(PathBuf::from),
            staff_roster: env::var("ONBEHALF_STAFF_ROSTER").ok().map(PathBuf::from),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("audit").join("ledger.jsonl")
    }

    pub fn state_db_path(&self) -> PathBuf {
        self.data_dir.join("state.db")
    }

    pub fn load_engine_config(&self) -> anyhow::Result<EngineConfig> {
        match self.engine_config {
            Some(ref path) => Ok(EngineConfig::from_file(path)?),
            None => Ok(EngineConfig::default()),
        }
    }

    pub fn load_roster(&self) -> anyhow::Result<Option<StaffRoster>> {
        match self.staff_roster {
            Some(ref path) => Ok(Some(StaffRoster::from_file(path)?)),
            None => Ok(None),
        }
    }
}
