use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{SimError, SimResult};
use crate::store::{VendorStore, object};

use super::{GmailStore, Mailbox};

const WATCH_EXPIRATION: &str = "9999999999999";

pub fn get_profile(store: &GmailStore, user_id: &str) -> SimResult<Value> {
    Ok(Value::Object(store.mailbox(user_id)?.profile.clone()))
}

pub fn watch(store: &mut GmailStore, user_id: &str, request: Value) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    mailbox.watch = object(request);
    debug!(%user_id, "watch registered");
    Ok(json!({
        "historyId": mailbox.history_id(),
        "expiration": WATCH_EXPIRATION,
    }))
}

pub fn stop(store: &mut GmailStore, user_id: &str) -> SimResult<Value> {
    store.mailbox_mut(user_id)?.watch.clear();
    Ok(json!({}))
}

pub fn exists(store: &GmailStore, user_id: &str) -> bool {
    store.db().users.contains_key(user_id)
}

/// Registers a new mailbox. The profile must name an email address.
pub fn create_user(store: &mut GmailStore, user_id: &str, profile: Value) -> SimResult<Value> {
    let email = profile
        .get("emailAddress")
        .and_then(Value::as_str)
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| SimError::invalid("A valid 'emailAddress' must be provided in the profile."))?;

    let mailbox = Mailbox::new(email);
    let created = serde_json::to_value(&mailbox)
        .map_err(|err| SimError::invalid(format!("unserializable mailbox: {err}")))?;
    store.db_mut().users.insert(user_id.to_string(), mailbox);
    info!(%user_id, "gmail user created");
    Ok(created)
}
