use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};

use super::{RedditStore, WikiPage};

/// `POST /r/{subreddit}/api/wiki/edit`: creates or overwrites the page.
pub fn edit(store: &mut RedditStore, subreddit: &str, page: &str, content: &str) -> SimResult<Value> {
    if page.trim().is_empty() {
        return Err(SimError::invalid("PAGE_NAME_REQUIRED"));
    }
    let entry = store
        .db
        .wiki
        .entry(subreddit.to_string())
        .or_default()
        .entry(page.to_string())
        .or_insert_with(WikiPage::default);
    entry.content = content.to_string();
    entry.revision += 1;
    debug!(%subreddit, %page, revision = entry.revision, "wiki page edited");
    Ok(json!({ "status": "wiki_page_edited", "page": page }))
}

pub fn page(store: &RedditStore, subreddit: &str, page: &str) -> SimResult<Value> {
    let found = store
        .db
        .wiki
        .get(subreddit)
        .and_then(|pages| pages.get(page))
        .ok_or_else(|| SimError::not_found("not_found"))?;
    Ok(json!({ "page": page, "content": found.content, "revision": found.revision }))
}

/// Page names of the subreddit's wiki, sorted.
pub fn pages(store: &RedditStore, subreddit: &str) -> SimResult<Value> {
    let names = store
        .db
        .wiki
        .get(subreddit)
        .map(|pages| pages.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    Ok(json!(names))
}
