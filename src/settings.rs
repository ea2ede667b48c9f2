use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::categorizer::KeywordTable;
use crate::db::DB_FILE;
use crate::error::{Result, TallyError};
use crate::importer::StatementRules;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub business_name: String,
    #[serde(default = "default_revenue_sources")]
    pub revenue_sources: Vec<String>,
    #[serde(default = "default_payroll_vendor")]
    pub payroll_vendor: String,
    #[serde(default)]
    pub statement_rules: StatementRules,
    #[serde(default)]
    pub keyword_table: KeywordTable,
}

fn default_revenue_sources() -> Vec<String> {
    vec!["DFC-Hacienda Hts".to_string(), "DFC-Rosemead".to_string()]
}

fn default_payroll_vendor() -> String {
    "Sure Payroll".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            business_name: String::new(),
            revenue_sources: default_revenue_sources(),
            payroll_vendor: default_payroll_vendor(),
            statement_rules: StatementRules::default(),
            keyword_table: KeywordTable::default(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DB_FILE)
    }

    /// Match a revenue source case-insensitively, returning its configured spelling.
    pub fn resolve_source(&self, raw: &str) -> Result<String> {
        self.revenue_sources
            .iter()
            .find(|s| s.eq_ignore_ascii_case(raw.trim()))
            .cloned()
            .ok_or_else(|| TallyError::UnknownSource(raw.to_string()))
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tally")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("tally")
}

fn parse_settings(content: &str) -> Settings {
    serde_json::from_str(content).unwrap_or_else(|e| {
        warn!("settings.json could not be parsed ({e}); using defaults");
        Settings::default()
    })
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(content) => parse_settings(&content),
            Err(e) => {
                warn!("settings.json could not be read ({e}); using defaults");
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| TallyError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
