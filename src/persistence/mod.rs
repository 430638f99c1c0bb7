use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::Deserialize;
use tracing::debug;

use crate::core::SyncError;

const APP_NAME: &str = "jpdb-sync";

pub const CONFIG_FILE: &str = "config.json";
pub const CACHE_FILE: &str = "word_cache.csv";

pub fn get_app_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        let app_dir = data_dir.join(APP_NAME);
        let _ = fs::create_dir_all(&app_dir);
        app_dir
    } else {
        PathBuf::from(".")
    }
}

pub fn get_data_file_path(filename: &str) -> PathBuf {
    get_app_data_dir().join(filename)
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Missing files load as `T::default()`.
pub fn load_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> Result<T, SyncError> {
    if !path.exists() {
        debug!("{} does not exist, using defaults", path.display());
        return Ok(T::default());
    }

    let json = fs::read_to_string(path)?;
    let data: T = serde_json::from_str(&json)?;
    debug!("Data loaded from: {}", path.display());
    Ok(data)
}
