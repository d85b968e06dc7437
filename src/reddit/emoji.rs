use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};

use super::{Emoji, RedditStore};

/// `POST /api/v1/{subreddit}/emoji.json`. Names are unique per subreddit.
pub fn add(store: &mut RedditStore, subreddit: &str, name: &str, css: Option<&str>) -> SimResult<Value> {
    if name.trim().is_empty() {
        return Err(SimError::invalid("Emoji name is required"));
    }
    let emojis = store.db.emoji.entry(subreddit.to_string()).or_default();
    if emojis.contains_key(name) {
        return Err(SimError::invalid("Emoji name already in use"));
    }
    emojis.insert(
        name.to_string(),
        Emoji {
            css: css.unwrap_or_default().to_string(),
            image_url: None,
        },
    );
    debug!(%subreddit, %name, "emoji added");
    Ok(json!({ "status": "success", "subreddit": subreddit, "emoji_name": name }))
}

pub fn delete(store: &mut RedditStore, subreddit: &str, emoji_name: &str) -> SimResult<Value> {
    store
        .db
        .emoji
        .get_mut(subreddit)
        .and_then(|emojis| emojis.remove(emoji_name))
        .ok_or_else(|| SimError::not_found("Emoji not found"))?;
    debug!(%subreddit, %emoji_name, "emoji deleted");
    Ok(json!({ "status": "deleted", "emoji_name": emoji_name }))
}

pub fn all(store: &RedditStore, subreddit: &str) -> SimResult<Value> {
    let emojis = store.db.emoji.get(subreddit).cloned().unwrap_or_default();
    Ok(json!({ "subreddit": subreddit, "emojis": emojis }))
}
