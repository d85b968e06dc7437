use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, bool_field, object};

use super::{RedditStore, prefixed_id};

fn thread_mut<'a>(store: &'a mut RedditStore, thread: &str) -> SimResult<&'a mut Entity> {
    store
        .db
        .live_threads
        .get_mut(thread)
        .ok_or_else(|| SimError::not_found("Live thread not found"))
}

pub fn create(store: &mut RedditStore, title: &str) -> SimResult<Value> {
    if title.trim().is_empty() {
        return Err(SimError::invalid("title is required"));
    }
    let id = prefixed_id(&mut store.db.live_threads, "live");
    store.db.live_threads.insert(object(json!({
        "id": id,
        "title": title,
        "updates": [],
        "closed": false,
    })));
    debug!(%id, "live thread created");
    Ok(json!({ "status": "live_thread_created", "thread_id": id }))
}

pub fn close(store: &mut RedditStore, thread: &str) -> SimResult<Value> {
    thread_mut(store, thread)?.insert("closed".to_string(), Value::Bool(true));
    debug!(%thread, "live thread closed");
    Ok(json!({ "status": "thread_closed", "thread": thread }))
}

/// Appends an update. Closed threads take no more updates.
pub fn update(store: &mut RedditStore, thread: &str, body: &str) -> SimResult<Value> {
    let live = thread_mut(store, thread)?;
    if bool_field(live, "closed") {
        return Err(SimError::invalid("Live thread is closed"));
    }
    let mut updates = match live.remove("updates") {
        Some(Value::Array(updates)) => updates,
        _ => Vec::new(),
    };
    updates.push(json!(body));
    live.insert("updates".to_string(), Value::Array(updates));
    debug!(%thread, "live update added");
    Ok(json!({ "status": "update_added", "body": body }))
}

pub fn get(store: &RedditStore, thread: &str) -> SimResult<Value> {
    let info = store
        .db
        .live_threads
        .get(thread)
        .ok_or_else(|| SimError::not_found("Live thread not found"))?;
    Ok(json!({ "thread": thread, "info": info }))
}
