use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::object;

use super::RedditStore;

const UNTITLED: &str = "Untitled Subreddit";

/// `POST /api/site_admin`: creates the subreddit or edits its title.
pub fn site_admin(store: &mut RedditStore, name: &str, title: &str) -> SimResult<Value> {
    if name.trim().is_empty() {
        return Err(SimError::invalid("BAD_SR_NAME"));
    }
    let patch = object(json!({ "title": title }));
    if store.db.subreddits.update(name, &patch).is_none() {
        store.db.subreddits.insert(object(json!({ "name": name, "title": title })));
    }
    debug!(%name, "subreddit saved");
    Ok(json!({ "status": "subreddit_created_or_edited", "name": name, "title": title }))
}

/// `GET /r/{subreddit}/about`. Unknown subreddits get placeholder info.
pub fn about(store: &RedditStore, subreddit: &str) -> SimResult<Value> {
    let info = match store.db.subreddits.get(subreddit) {
        Some(found) => json!(found),
        None => json!({ "title": UNTITLED }),
    };
    Ok(json!({ "subreddit": subreddit, "info": info }))
}
