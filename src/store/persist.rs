use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

/// What `load` does when the state file is absent.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MissingFile {
    Ignore,
    Error,
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let payload = serde_json::to_string_pretty(value)?;
    fs::write(path, payload)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path, missing: MissingFile) -> AppResult<Option<T>> {
    if !path.exists() {
        return match missing {
            MissingFile::Ignore => Ok(None),
            MissingFile::Error => Err(AppError::MissingState(path.display().to_string())),
        };
    }

    let raw = fs::read_to_string(path)?;
    let value = serde_json::from_str(&raw)?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn missing_file_policy_is_respected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.json");

        let ignored: Option<Value> =
            load_json(&path, MissingFile::Ignore).expect("ignore policy");
        assert!(ignored.is_none());

        match load_json::<Value>(&path, MissingFile::Error) {
            Err(AppError::MissingState(_)) => {}
            other => panic!("expected missing state error, got {other:?}"),
        }
    }

    #[test]
    fn saves_into_nested_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("default").join("slack.json");

        save_json(&path, &json!({ "users": {} })).expect("save");
        let loaded: Option<Value> = load_json(&path, MissingFile::Error).expect("load");
        assert_eq!(loaded, Some(json!({ "users": {} })));
    }
}
