use serde_json::{Value, json};

use crate::error::{SimError, SimResult};

use super::RedditStore;

/// `GET /user/{username}/about`.
pub fn about(store: &RedditStore, username: &str) -> SimResult<Value> {
    let profile = store
        .db
        .users
        .get(username)
        .ok_or_else(|| SimError::not_found("not_found"))?;
    Ok(json!({ "status": "ok", "profile": profile }))
}
