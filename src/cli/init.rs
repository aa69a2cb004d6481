use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::settings::{load_settings_from, save_settings_to, settings_path, Settings};

/// Values for `reimburse init`; `None` keeps what is already saved.
#[derive(Debug, Clone, Default)]
pub struct InitArgs {
    pub sheets_url: Option<String>,
    pub default_funding_source: Option<String>,
    pub invoice_dir: Option<String>,
    pub output_dir: Option<String>,
    pub fetch_timeout: Option<u64>,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = settings_path();
    let settings = update_settings(&path, args)?;
    println!("{} {}", "Saved".green().bold(), path.display());
    if settings.sheets_url.is_empty() {
        println!("No spreadsheet URL yet. Pass --sheets-url or set SHEETS_URL before building.");
    }
    Ok(())
}

fn update_settings(path: &Path, args: InitArgs) -> Result<Settings> {
    let mut settings = load_settings_from(path);
    if let Some(url) = args.sheets_url {
        settings.sheets_url = url;
    }
    if let Some(source) = args.default_funding_source {
        settings.default_funding_source = source;
    }
    if let Some(dir) = args.invoice_dir {
        settings.invoice_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        settings.output_dir = dir;
    }
    if let Some(secs) = args.fetch_timeout {
        settings.fetch_timeout_secs = secs;
    }
    save_settings_to(&settings, path)?;
    Ok(settings)
}
