use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{SimError, SimResult};
use crate::store::object;

use super::{ChatStore, body_field, fresh_name, mask_fields, now};

/// Registers a user named `users/userN`. The type defaults to `HUMAN`.
pub fn create_user(store: &mut ChatStore, display_name: &str, kind: Option<&str>) -> Value {
    let name = fresh_name(&mut store.db.users, |n| format!("users/user{n}"));
    let user = object(json!({
        "name": name,
        "displayName": display_name,
        "type": kind.unwrap_or("HUMAN"),
        "createTime": now(),
    }));
    info!(%name, "chat user created");
    Value::Object(store.db.users.insert(user).clone())
}

/// Makes `user` the caller of every following request.
pub fn change_user(store: &mut ChatStore, user: &str) {
    store.set_current_user(user);
    info!(%user, "chat caller changed");
}

pub fn get_space_read_state(store: &ChatStore, name: &str) -> SimResult<Value> {
    store
        .db
        .space_read_states
        .get(name)
        .map(|state| Value::Object(state.clone()))
        .ok_or_else(|| SimError::not_found(format!("space read state {name}")))
}

pub fn update_space_read_state(
    store: &mut ChatStore,
    name: &str,
    update_mask: &str,
    body: Value,
) -> SimResult<Value> {
    let state = store
        .db
        .space_read_states
        .get_mut(name)
        .ok_or_else(|| SimError::not_found(format!("space read state {name}")))?;

    let masks = mask_fields(update_mask, &["last_read_time"]);
    if masks.iter().any(|mask| mask == "last_read_time") {
        if let Some(time) = body_field(&body, "last_read_time", "lastReadTime") {
            state.insert("lastReadTime".to_string(), time.clone());
        }
    } else {
        debug!(%update_mask, "no supported field in read state mask");
    }
    Ok(Value::Object(state.clone()))
}

pub fn get_thread_read_state(store: &ChatStore, name: &str) -> SimResult<Value> {
    store
        .db
        .thread_read_states
        .get(name)
        .map(|state| Value::Object(state.clone()))
        .ok_or_else(|| SimError::not_found(format!("thread read state {name}")))
}

pub fn get_space_notification_setting(store: &ChatStore, name: &str) -> SimResult<Value> {
    store
        .db
        .notification_settings
        .get(name)
        .map(|setting| Value::Object(setting.clone()))
        .ok_or_else(|| SimError::not_found(format!("notification setting {name}")))
}

pub fn patch_space_notification_setting(
    store: &mut ChatStore,
    name: &str,
    update_mask: &str,
    body: Value,
) -> SimResult<Value> {
    let setting = store
        .db
        .notification_settings
        .get_mut(name)
        .ok_or_else(|| SimError::not_found(format!("notification setting {name}")))?;

    let fields = [
        ("notification_setting", "notificationSetting"),
        ("mute_setting", "muteSetting"),
    ];
    let all = fields.map(|(mask, _)| mask);
    for mask in mask_fields(update_mask, &all) {
        let Some((snake, camel)) = fields.iter().find(|(field, _)| *field == mask) else {
            continue;
        };
        if let Some(value) = body_field(&body, snake, camel) {
            setting.insert(camel.to_string(), value.clone());
        }
    }
    Ok(Value::Object(setting.clone()))
}
