use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReimburseError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub sheets_url: String,
    #[serde(default)]
    pub default_funding_source: String,
    #[serde(default = "default_invoice_dir")]
    pub invoice_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_invoice_dir() -> String {
    "upwork_invoices".to_string()
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheets_url: String::new(),
            default_funding_source: String::new(),
            invoice_dir: default_invoice_dir(),
            output_dir: default_output_dir(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("reimburse")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
            Settings::default()
        })
    } else {
        Settings::default()
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ReimburseError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

/// Values given on the command line or through the environment. Each one
/// wins over the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub sheets_url: Option<String>,
    pub default_funding_source: Option<String>,
    pub invoice_dir: Option<String>,
    pub output_dir: Option<String>,
}

/// Run configuration, fixed at startup and passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub sheets_url: String,
    pub default_funding_source: String,
    pub invoice_dir: PathBuf,
    pub output_dir: PathBuf,
    pub fetch_timeout: Duration,
}

impl Config {
    pub fn resolve(overrides: &Overrides, settings: &Settings) -> Result<Self> {
        let pick = |o: &Option<String>, s: &str| {
            o.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(s.trim())
                .to_string()
        };

        let sheets_url = pick(&overrides.sheets_url, &settings.sheets_url);
        if sheets_url.is_empty() {
            return Err(ReimburseError::Settings(
                "no spreadsheet URL: pass --sheets-url, set SHEETS_URL, or run `reimburse init`".into(),
            ));
        }
        let default_funding_source =
            pick(&overrides.default_funding_source, &settings.default_funding_source);
        if default_funding_source.is_empty() {
            return Err(ReimburseError::Settings(
                "no default funding source: pass --default-funding-source or set DEFAULT_FUNDING_SOURCE"
                    .into(),
            ));
        }
        let invoice_dir = pick(&overrides.invoice_dir, &settings.invoice_dir);
        let output_dir = pick(&overrides.output_dir, &settings.output_dir);

        Ok(Self {
            sheets_url,
            default_funding_source,
            invoice_dir: PathBuf::from(if invoice_dir.is_empty() { default_invoice_dir() } else { invoice_dir }),
            output_dir: PathBuf::from(if output_dir.is_empty() { default_output_dir() } else { output_dir }),
            fetch_timeout: Duration::from_secs(settings.fetch_timeout_secs.max(1)),
        })
    }
}
