use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DATA_DIR_ENV: &str = "RSVPREADER_DATA_DIR";

const PROGRESS_FILE: &str = "reading_progress.json";
const SETTINGS_FILE: &str = "app_settings.json";

pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join("rsvpreader"))
}

pub fn progress_file_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(PROGRESS_FILE))
}

pub fn settings_file_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(SETTINGS_FILE))
}
