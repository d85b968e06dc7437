use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Collection, Entity, object};

use super::{GmailStore, MailSettings};

pub fn list(store: &GmailStore, user_id: &str) -> SimResult<Value> {
    let aliases = store.mailbox(user_id)?.settings.send_as.list();
    Ok(json!({ "sendAs": aliases }))
}

pub fn get(store: &GmailStore, user_id: &str, email: &str) -> SimResult<Value> {
    store
        .mailbox(user_id)?
        .settings
        .send_as
        .get(email)
        .map(|alias| Value::Object(alias.clone()))
        .ok_or_else(|| missing_alias(email))
}

/// Creates an alias. An existing alias for the same address is replaced.
pub fn create(store: &mut GmailStore, user_id: &str, send_as: Value) -> SimResult<Value> {
    let settings = &mut store.mailbox_mut(user_id)?.settings;
    let input = object(send_as);
    let email = match input.get("sendAsEmail").and_then(Value::as_str) {
        Some(email) => email.to_string(),
        None => format!("alias_{}@example.com", settings.send_as.len() + 1),
    };

    let mut alias = Entity::new();
    alias.insert("sendAsEmail".to_string(), json!(email));
    for field in ["displayName", "replyToAddress"] {
        alias.insert(
            field.to_string(),
            input.get(field).cloned().unwrap_or_else(|| json!(email)),
        );
    }
    alias.insert(
        "signature".to_string(),
        input.get("signature").cloned().unwrap_or(json!("")),
    );
    alias.insert("verificationStatus".to_string(), json!("accepted"));

    debug!(%email, "send-as alias created");
    Ok(Value::Object(settings.send_as.insert(alias).clone()))
}

pub fn update(store: &mut GmailStore, user_id: &str, email: &str, send_as: Value) -> SimResult<Value> {
    store
        .mailbox_mut(user_id)?
        .settings
        .send_as
        .update(email, &object(send_as))
        .map(|alias| Value::Object(alias.clone()))
        .ok_or_else(|| missing_alias(email))
}

pub fn patch(store: &mut GmailStore, user_id: &str, email: &str, send_as: Value) -> SimResult<Value> {
    update(store, user_id, email, send_as)
}

pub fn delete(store: &mut GmailStore, user_id: &str, email: &str) -> SimResult<Value> {
    let settings = &mut store.mailbox_mut(user_id)?.settings;
    let removed = settings
        .send_as
        .delete(email)
        .ok_or_else(|| missing_alias(email))?;
    settings.smime_info.remove(email);
    Ok(Value::Object(removed))
}

/// Moves a pending alias to `accepted`. Other states are left alone.
pub fn verify(store: &mut GmailStore, user_id: &str, email: &str) -> SimResult<Value> {
    let alias = store
        .mailbox_mut(user_id)?
        .settings
        .send_as
        .get_mut(email)
        .ok_or_else(|| missing_alias(email))?;
    if alias.get("verificationStatus").and_then(Value::as_str) == Some("pending") {
        alias.insert("verificationStatus".to_string(), json!("accepted"));
    }
    Ok(Value::Object(alias.clone()))
}

pub fn smime_list(store: &GmailStore, user_id: &str, email: &str) -> SimResult<Value> {
    let settings = &store.mailbox(user_id)?.settings;
    let configs = settings
        .smime_info
        .get(email)
        .map(Collection::list)
        .unwrap_or_default();
    Ok(json!({ "smimeInfo": configs }))
}

pub fn smime_get(store: &GmailStore, user_id: &str, email: &str, id: &str) -> SimResult<Value> {
    store
        .mailbox(user_id)?
        .settings
        .smime_info
        .get(email)
        .and_then(|configs| configs.get(id))
        .map(|config| Value::Object(config.clone()))
        .ok_or_else(|| missing_smime(email, id))
}

/// Stores an S/MIME config, creating a bare alias entry when none exists.
pub fn smime_insert(store: &mut GmailStore, user_id: &str, email: &str, smime: Value) -> SimResult<Value> {
    let settings = &mut store.mailbox_mut(user_id)?.settings;
    if !settings.send_as.contains(email) {
        let mut alias = Entity::new();
        alias.insert("sendAsEmail".to_string(), json!(email));
        settings.send_as.insert(alias);
    }

    settings.smime_counter += 1;
    let id = format!("smime_{}", settings.smime_counter);
    let mut config = Entity::new();
    config.insert("id".to_string(), json!(id));
    config.insert(
        "encryptedKey".to_string(),
        smime.get("encryptedKey").cloned().unwrap_or(json!("")),
    );

    let configs = settings.smime_info.entry(email.to_string()).or_default();
    debug!(%email, %id, "smime config inserted");
    Ok(Value::Object(configs.insert(config).clone()))
}

pub fn smime_update(
    store: &mut GmailStore,
    user_id: &str,
    email: &str,
    id: &str,
    smime: Value,
) -> SimResult<Value> {
    configs_mut(&mut store.mailbox_mut(user_id)?.settings, email)?
        .update(id, &object(smime))
        .map(|config| Value::Object(config.clone()))
        .ok_or_else(|| missing_smime(email, id))
}

pub fn smime_patch(
    store: &mut GmailStore,
    user_id: &str,
    email: &str,
    id: &str,
    smime: Value,
) -> SimResult<Value> {
    smime_update(store, user_id, email, id, smime)
}

pub fn smime_delete(store: &mut GmailStore, user_id: &str, email: &str, id: &str) -> SimResult<Value> {
    configs_mut(&mut store.mailbox_mut(user_id)?.settings, email)?
        .delete(id)
        .map(Value::Object)
        .ok_or_else(|| missing_smime(email, id))
}

/// Marks one config as the alias default, clearing the flag on the others.
pub fn smime_set_default(
    store: &mut GmailStore,
    user_id: &str,
    email: &str,
    id: &str,
) -> SimResult<Value> {
    let configs = configs_mut(&mut store.mailbox_mut(user_id)?.settings, email)?;
    if !configs.contains(id) {
        return Err(missing_smime(email, id));
    }

    for config in configs.iter_mut() {
        config.remove("default");
    }
    let config = configs.get_mut(id).ok_or_else(|| missing_smime(email, id))?;
    config.insert("default".to_string(), json!(true));
    Ok(Value::Object(config.clone()))
}

fn configs_mut<'a>(settings: &'a mut MailSettings, email: &str) -> SimResult<&'a mut Collection> {
    if !settings.send_as.contains(email) {
        return Err(missing_alias(email));
    }
    Ok(settings.smime_info.entry(email.to_string()).or_default())
}

fn missing_alias(email: &str) -> SimError {
    SimError::not_found(format!("send-as alias {email}"))
}

fn missing_smime(email: &str, id: &str) -> SimError {
    SimError::not_found(format!("smime config {id} for {email}"))
}
