use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

const APP_DIR: &str = "apisim";

#[derive(Debug, Clone)]
pub struct AppPaths {
    profiles_dir: PathBuf,
    state_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> AppResult<Self> {
        let config_root = dirs::config_dir()
            .ok_or_else(|| AppError::Config("unable to resolve config directory".to_string()))?;
        let data_root = dirs::data_dir()
            .ok_or_else(|| AppError::Config("unable to resolve data directory".to_string()))?;

        Self::rooted(&config_root.join(APP_DIR), &data_root.join(APP_DIR))
    }

    /// Layout under explicit roots, creating the directories it needs.
    pub fn rooted(config_dir: &Path, data_dir: &Path) -> AppResult<Self> {
        let profiles_dir = config_dir.join("profiles");
        let state_dir = data_dir.join("state");

        fs::create_dir_all(&profiles_dir)?;
        fs::create_dir_all(&state_dir)?;

        Ok(Self {
            profiles_dir,
            state_dir,
        })
    }

    pub fn settings_file(&self, profile: &str) -> PathBuf {
        self.profiles_dir.join(format!("{profile}.json"))
    }

    /// Directory holding one JSON state file per vendor.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }
}
