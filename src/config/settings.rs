use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppResult;

const DEFAULT_GMAIL_USER: &str = "me";
const DEFAULT_CHAT_USER: &str = "users/user123";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Replaces the default state directory.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    #[serde(default)]
    pub gmail_user: Option<String>,
    #[serde(default)]
    pub chat_user: Option<String>,
}

impl Settings {
    pub fn gmail_user(&self) -> &str {
        self.gmail_user.as_deref().unwrap_or(DEFAULT_GMAIL_USER)
    }

    pub fn chat_user(&self) -> &str {
        self.chat_user.as_deref().unwrap_or(DEFAULT_CHAT_USER)
    }

    pub fn state_dir(&self) -> Option<&Path> {
        self.state_dir.as_deref()
    }
}

pub fn load(path: &Path) -> AppResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)?;
    let settings = serde_json::from_str(&raw)?;
    Ok(settings)
}

pub fn save(path: &Path, settings: &Settings) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let payload = serde_json::to_string_pretty(settings)?;
    fs::write(path, payload)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = load(&dir.path().join("none.json")).expect("load");

        assert_eq!(settings.gmail_user(), "me");
        assert_eq!(settings.chat_user(), "users/user123");
        assert!(settings.state_dir().is_none());
    }

    #[test]
    fn saved_settings_round_trip_privately() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profiles/work.json");
        let settings = Settings {
            gmail_user: Some("ops@example.com".to_string()),
            ..Settings::default()
        };

        save(&path, &settings).expect("save");
        assert_eq!(load(&path).expect("load"), settings);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).expect("metadata").permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
