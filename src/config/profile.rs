use crate::error::{AppError, AppResult};

pub const DEFAULT_PROFILE: &str = "default";

/// Trimmed profile name. Blank names fall back to `default`; names that
/// would escape the profile directory are rejected.
pub fn resolve_profile(requested: &str) -> AppResult<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_PROFILE.to_string());
    }
    if trimmed.contains(['/', '\\']) || trimmed.starts_with('.') {
        return Err(AppError::InvalidInput(format!(
            "invalid profile name: {trimmed}"
        )));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_profiles_use_the_default() {
        assert_eq!(resolve_profile("  ").expect("profile"), "default");
        assert_eq!(resolve_profile(" work ").expect("profile"), "work");
    }

    #[test]
    fn path_like_profiles_are_rejected() {
        for name in ["../etc", "a/b", ".hidden"] {
            assert!(resolve_profile(name).is_err(), "{name}");
        }
    }
}
