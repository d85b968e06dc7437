use serde_json::{Value, json};
use tracing::debug;

use crate::error::SimResult;
use crate::store::{Entity, bool_field, str_field};

use super::RedditStore;

fn visible(announcement: &&Entity) -> bool {
    !bool_field(announcement, "hidden")
}

/// Every announcement that has not been hidden.
pub fn list(store: &RedditStore) -> SimResult<Value> {
    let shown = store.db.announcements.iter().filter(visible).collect::<Vec<_>>();
    Ok(json!(shown))
}

pub fn unread(store: &RedditStore) -> SimResult<Value> {
    let unread = store
        .db
        .announcements
        .iter()
        .filter(visible)
        .filter(|announcement| !bool_field(announcement, "read"))
        .collect::<Vec<_>>();
    Ok(json!(unread))
}

/// Sets `flag` on the listed announcements. Unknown ids are ignored.
fn flag(store: &mut RedditStore, ids: &[&str], flag: &str) -> usize {
    let mut changed = 0;
    for announcement in &mut store.db.announcements {
        let id = str_field(announcement, "id");
        if ids.iter().any(|wanted| *wanted == id) {
            announcement.insert(flag.to_string(), Value::Bool(true));
            changed += 1;
        }
    }
    changed
}

pub fn hide(store: &mut RedditStore, ids: &[&str]) -> SimResult<Value> {
    let hidden = flag(store, ids, "hidden");
    debug!(hidden, "announcements hidden");
    Ok(json!({ "status": "announcements_hidden", "ids": ids }))
}

pub fn read(store: &mut RedditStore, ids: &[&str]) -> SimResult<Value> {
    let read = flag(store, ids, "read");
    debug!(read, "announcements read");
    Ok(json!({ "status": "announcements_marked_read", "ids": ids }))
}

pub fn read_all(store: &mut RedditStore) -> SimResult<Value> {
    for announcement in &mut store.db.announcements {
        announcement.insert("read".to_string(), Value::Bool(true));
    }
    debug!("all announcements read");
    Ok(json!({ "status": "all_announcements_marked_read" }))
}
