//! Server configuration: TOML file, then environment, then command line.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Where item and option rows are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The remote Google Sheets document
    #[default]
    Google,
    /// A throwaway in-process sheet, for demos
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub backend: BackendKind,
    pub spreadsheet_id: Option<String>,
    pub access_token: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
    pub items_sheet: String,
    pub chips_sheet: String,
    pub locations_sheet: String,
    /// Prepended to the number typed in the add form
    pub id_prefix: String,
    pub static_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "127.0.0.1:3000".to_string(),
            backend: BackendKind::Google,
            spreadsheet_id: None,
            access_token: None,
            api_base: "https://sheets.googleapis.com/v4".to_string(),
            timeout_secs: 30,
            items_sheet: "items".to_string(),
            chips_sheet: "chips".to_string(),
            locations_sheet: "locations".to_string(),
            id_prefix: "VEWD-".to_string(),
            static_dir: "static".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file; unset keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `INVENTORY_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("INVENTORY_SPREADSHEET_ID") {
            self.spreadsheet_id = Some(id);
        }
        if let Some(token) = lookup("INVENTORY_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(bind) = lookup("INVENTORY_BIND") {
            self.bind = bind;
        }
    }

    /// Check that the selected backend has what it needs
    pub fn validate(&self) -> Result<()> {
        if self.backend == BackendKind::Google {
            if self.spreadsheet_id.as_deref().unwrap_or("").is_empty() {
                return Err(Error::Config("spreadsheet_id is required for the google backend".into()));
            }
            if self.access_token.as_deref().unwrap_or("").is_empty() {
                return Err(Error::Config("access_token is required for the google backend".into()));
            }
        }
        let sheets = [&self.items_sheet, &self.chips_sheet, &self.locations_sheet];
        if sheets.iter().any(|name| name.trim().is_empty()) {
            return Err(Error::Config("sheet names cannot be empty".into()));
        }
        Ok(())
    }
}
