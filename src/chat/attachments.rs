use serde_json::Value;

use crate::error::{SimError, SimResult};

use super::ChatStore;

/// Looks up `spaces/{space}/messages/{message}/attachments/{attachment}` on its message.
pub fn get(store: &ChatStore, name: &str) -> SimResult<Value> {
    let parts = name.split('/').collect::<Vec<_>>();
    let well_formed = parts.len() >= 6
        && parts[0] == "spaces"
        && parts[2] == "messages"
        && parts[4] == "attachments"
        && !parts[5].is_empty();
    if !well_formed {
        return Err(SimError::invalid(format!("invalid attachment name: {name}")));
    }

    let message_name = parts[..4].join("/");
    let message = store
        .db
        .messages
        .get(&message_name)
        .ok_or_else(|| SimError::not_found(format!("message {message_name}")))?;

    message
        .get("attachment")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|attachment| attachment.get("name").and_then(Value::as_str) == Some(name))
        .cloned()
        .ok_or_else(|| SimError::not_found(format!("attachment {name}")))
}
