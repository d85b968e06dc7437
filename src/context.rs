use std::path::PathBuf;

use crate::cli::Vendor;
use crate::config::{self, AppPaths, Settings};
use crate::error::AppResult;
use crate::output::Output;

#[derive(Debug)]
pub struct AppContext {
    pub profile: String,
    pub verbose: u8,
    pub paths: AppPaths,
    pub settings: Settings,
    pub output: Output,
}

impl AppContext {
    pub fn bootstrap(profile: String, json: bool, verbose: u8) -> AppResult<Self> {
        let paths = AppPaths::discover()?;
        Self::with_paths(paths, &profile, json, verbose)
    }

    pub fn with_paths(paths: AppPaths, profile: &str, json: bool, verbose: u8) -> AppResult<Self> {
        let profile = config::resolve_profile(profile)?;
        let settings = config::load_settings(&paths, &profile)?;
        let output = Output::new(json);

        Ok(Self {
            profile,
            verbose,
            paths,
            settings,
            output,
        })
    }

    /// `<state_dir>/<profile>/<vendor>.json`, honouring the profile's
    /// `state_dir` override.
    pub fn state_file(&self, vendor: Vendor) -> PathBuf {
        let root = self
            .settings
            .state_dir()
            .unwrap_or_else(|| self.paths.state_dir());
        root.join(&self.profile).join(format!("{vendor}.json"))
    }

    /// Writes default settings for the profile unless it already has some.
    pub fn ensure_settings(&self) -> AppResult<bool> {
        if self.paths.settings_file(&self.profile).exists() {
            return Ok(false);
        }
        config::save_settings(&self.paths, &self.profile, &self.settings)?;
        Ok(true)
    }
}
