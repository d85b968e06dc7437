use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::error::{SimError, SimResult};
use crate::store::{object, str_field};

use super::{SlackStore, require};

fn seconds(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn add(
    store: &mut SlackStore,
    user_id: &str,
    text: &str,
    time: &str,
    channel_id: Option<&str>,
) -> SimResult<Value> {
    if [user_id, text, time].iter().any(|arg| arg.trim().is_empty()) {
        return Err(SimError::invalid("missing_required_arguments"));
    }
    if !store.user_exists(user_id) {
        return Err(SimError::not_found("user_not_found"));
    }
    if seconds(time).is_none() {
        return Err(SimError::invalid("invalid_time"));
    }

    let id = Uuid::new_v4().to_string();
    let reminder = store.db.reminders.insert(object(json!({
        "id": id,
        "creator_id": user_id,
        "user_id": user_id,
        "text": text,
        "time": time,
        "complete_ts": null,
        "channel_id": channel_id,
    })));
    debug!(%id, %user_id, "reminder added");
    Ok(json!({ "reminder": reminder }))
}

/// Marks the reminder complete. Completing twice fails.
pub fn complete(store: &mut SlackStore, reminder_id: &str, complete_ts: &str) -> SimResult<Value> {
    let reminder_id = require(Some(reminder_id), "missing_reminder_id")?;
    let complete_ts = require(Some(complete_ts), "missing_complete_ts")?;
    if seconds(complete_ts).is_none() {
        return Err(SimError::invalid("invalid_complete_ts"));
    }

    let reminder = store
        .db
        .reminders
        .get_mut(reminder_id)
        .ok_or_else(|| SimError::not_found("reminder_not_found"))?;
    if reminder.get("complete_ts").is_some_and(|ts| !ts.is_null()) {
        return Err(SimError::invalid("already_complete"));
    }
    reminder.insert("complete_ts".to_string(), json!(complete_ts));
    debug!(%reminder_id, "reminder completed");
    Ok(json!({}))
}

pub fn delete(store: &mut SlackStore, reminder_id: &str) -> SimResult<Value> {
    let reminder_id = require(Some(reminder_id), "missing_reminder_id")?;
    store
        .db
        .reminders
        .delete(reminder_id)
        .ok_or_else(|| SimError::not_found("reminder_not_found"))?;
    debug!(%reminder_id, "reminder deleted");
    Ok(json!({}))
}

pub fn info(store: &SlackStore, reminder_id: &str) -> SimResult<Value> {
    let reminder_id = require(Some(reminder_id), "missing_reminder_id")?;
    let reminder = store
        .db
        .reminders
        .get(reminder_id)
        .ok_or_else(|| SimError::not_found("reminder_not_found"))?;
    Ok(json!({ "reminder": reminder }))
}

/// Reminders created by `user_id`.
pub fn list(store: &SlackStore, user_id: &str) -> SimResult<Value> {
    let user_id = require(Some(user_id), "missing_user_id")?;
    if !store.user_exists(user_id) {
        return Err(SimError::not_found("user_not_found"));
    }

    let reminders = store
        .db
        .reminders
        .iter()
        .filter(|reminder| str_field(reminder, "creator_id") == user_id)
        .collect::<Vec<_>>();
    Ok(json!({ "reminders": reminders }))
}
