//! Reddit API resources that keep state.
//!
//! Things are addressed by prefixed ids (`t1_3`, `t3_7`, `col_2`, ...).
//! Endpoints that only ever answered with fixed sample data are routed
//! through [`unsimulated`] and fail with `Unsupported`.

pub mod announcements;
pub mod collections;
pub mod emoji;
pub mod links;
pub mod live;
pub mod messages;
pub mod modnotes;
pub mod multis;
pub mod subreddits;
pub mod unsimulated;
pub mod users;
pub mod widgets;
pub mod wiki;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::error::SimResult;
use crate::store::{Collection, Entity, MissingFile, VendorStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditDb {
    #[serde(default)]
    pub announcements: Vec<Entity>,
    #[serde(default)]
    pub captcha_needed: bool,
    #[serde(default)]
    pub collections: Collection,
    /// Subreddit name to emoji name to emoji.
    #[serde(default)]
    pub emoji: BTreeMap<String, BTreeMap<String, Emoji>>,
    #[serde(default)]
    pub comments: Collection,
    #[serde(default)]
    pub links: Collection,
    #[serde(default)]
    pub live_threads: Collection,
    #[serde(default)]
    pub messages: Collection,
    #[serde(default)]
    pub multis: Collection,
    #[serde(default = "named")]
    pub subreddits: Collection,
    #[serde(default = "named")]
    pub users: Collection,
    #[serde(default)]
    pub widgets: Collection,
    /// Subreddit name to page name to page.
    #[serde(default)]
    pub wiki: BTreeMap<String, BTreeMap<String, WikiPage>>,
    /// Username to the moderator notes about them.
    #[serde(default)]
    pub modnotes: BTreeMap<String, Vec<Entity>>,
}

fn named() -> Collection {
    Collection::keyed("name")
}

impl Default for RedditDb {
    fn default() -> Self {
        Self {
            announcements: Vec::new(),
            captcha_needed: false,
            collections: Collection::default(),
            emoji: BTreeMap::new(),
            comments: Collection::default(),
            links: Collection::default(),
            live_threads: Collection::default(),
            messages: Collection::default(),
            multis: Collection::default(),
            subreddits: named(),
            users: named(),
            widgets: Collection::default(),
            wiki: BTreeMap::new(),
            modnotes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WikiPage {
    pub content: String,
    /// Number of edits so far.
    #[serde(default)]
    pub revision: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RedditStore {
    db: RedditDb,
}

impl VendorStore for RedditStore {
    type Db = RedditDb;

    const VENDOR: &'static str = "reddit";
    const MISSING_FILE: MissingFile = MissingFile::Ignore;

    fn from_db(db: RedditDb) -> Self {
        Self { db }
    }

    fn db(&self) -> &RedditDb {
        &self.db
    }

    fn db_mut(&mut self) -> &mut RedditDb {
        &mut self.db
    }
}

/// `GET /api/needs_captcha`.
pub fn needs_captcha(store: &RedditStore) -> SimResult<Value> {
    Ok(json!(store.db.captcha_needed))
}

/// Reddit answers every failure with `{"error": message}`.
pub fn respond(result: SimResult<Value>) -> Value {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "reddit request failed");
            json!({ "error": err.message() })
        }
    }
}

/// Next id of `collection` with its thing prefix, e.g. `t3_4`.
pub(crate) fn prefixed_id(collection: &mut Collection, prefix: &str) -> String {
    format!("{prefix}_{}", collection.next_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    #[test]
    fn prefixed_ids_never_repeat() {
        let mut links = Collection::default();
        assert_eq!(prefixed_id(&mut links, "t3"), "t3_1");
        assert_eq!(prefixed_id(&mut links, "t3"), "t3_2");
    }

    #[test]
    fn failures_become_error_objects() {
        assert_eq!(
            respond(Err(SimError::not_found("not_found"))),
            json!({ "error": "not_found" })
        );
        assert_eq!(respond(Ok(json!([1]))), json!([1]));
    }
}
