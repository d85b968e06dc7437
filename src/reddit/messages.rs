use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::object;

use super::{RedditStore, prefixed_id};

/// `POST /api/compose`. Recipient, subject and text are all required.
pub fn compose(store: &mut RedditStore, to: &str, subject: &str, text: &str) -> SimResult<Value> {
    for (value, code) in [(to, "NO_USER"), (subject, "NO_SUBJECT"), (text, "NO_TEXT")] {
        if value.trim().is_empty() {
            return Err(SimError::invalid(code));
        }
    }

    let id = prefixed_id(&mut store.db.messages, "msg");
    store.db.messages.insert(object(json!({
        "id": id,
        "to": to,
        "subject": subject,
        "text": text,
    })));
    debug!(%id, %to, "message composed");
    Ok(json!({ "status": "message_sent", "message_id": id }))
}

pub fn del_msg(store: &mut RedditStore, id: &str) -> SimResult<Value> {
    store
        .db
        .messages
        .delete(id)
        .ok_or_else(|| SimError::not_found("not_found"))?;
    debug!(%id, "message deleted");
    Ok(json!({ "status": "message_deleted", "id": id }))
}

pub fn inbox(store: &RedditStore) -> SimResult<Value> {
    Ok(json!(store.db.messages.list()))
}
