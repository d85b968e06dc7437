use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, object};

use super::GmailStore;

pub fn create(store: &mut GmailStore, user_id: &str, label: Value) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let id = format!("Label_{}", mailbox.labels.next_id());
    let input = object(label);

    let mut record = Entity::new();
    record.insert("id".to_string(), json!(id));
    record.insert(
        "name".to_string(),
        input.get("name").cloned().unwrap_or_else(|| json!(id)),
    );
    record.insert(
        "labelListVisibility".to_string(),
        input
            .get("labelListVisibility")
            .cloned()
            .unwrap_or(json!("labelShow")),
    );
    record.insert(
        "messageListVisibility".to_string(),
        input
            .get("messageListVisibility")
            .cloned()
            .unwrap_or(json!("show")),
    );

    debug!(%id, "label created");
    Ok(Value::Object(mailbox.labels.insert(record).clone()))
}

pub fn get(store: &GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    store
        .mailbox(user_id)?
        .labels
        .get(id)
        .map(|label| Value::Object(label.clone()))
        .ok_or_else(|| SimError::not_found(format!("label {id}")))
}

pub fn list(store: &GmailStore, user_id: &str) -> SimResult<Value> {
    let labels = store.mailbox(user_id)?.labels.list();
    Ok(json!({ "labels": labels }))
}

pub fn update(store: &mut GmailStore, user_id: &str, id: &str, label: Value) -> SimResult<Value> {
    store
        .mailbox_mut(user_id)?
        .labels
        .update(id, &object(label))
        .map(|label| Value::Object(label.clone()))
        .ok_or_else(|| SimError::not_found(format!("label {id}")))
}

pub fn patch(store: &mut GmailStore, user_id: &str, id: &str, label: Value) -> SimResult<Value> {
    update(store, user_id, id, label)
}

pub fn delete(store: &mut GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    store
        .mailbox_mut(user_id)?
        .labels
        .delete(id)
        .map(Value::Object)
        .ok_or_else(|| SimError::not_found(format!("label {id}")))
}
