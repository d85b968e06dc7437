use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, bool_field, object, str_field};

use super::{SlackStore, now_ts};

/// Arguments shared by `usergroups.create` and `usergroups.update`.
#[derive(Debug, Clone, Default)]
pub struct UsergroupFields<'a> {
    pub name: Option<&'a str>,
    pub handle: Option<&'a str>,
    pub description: Option<&'a str>,
    pub channel_ids: Option<Vec<&'a str>>,
    pub team_id: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListUsergroups<'a> {
    pub team_id: Option<&'a str>,
    pub include_disabled: bool,
    pub include_count: bool,
    pub include_users: bool,
}

fn check_channels(store: &SlackStore, channel_ids: Option<&[&str]>) -> SimResult<()> {
    match channel_ids {
        Some(ids) if ids.iter().any(|id| !store.db.has_channel(id)) => {
            Err(SimError::invalid("invalid_channel_id"))
        }
        _ => Ok(()),
    }
}

/// Name and handle are unique, case-insensitively, among other groups.
fn check_unique(store: &SlackStore, except: Option<&str>, fields: &UsergroupFields<'_>) -> SimResult<()> {
    let others = || {
        store
            .db
            .usergroups
            .iter()
            .filter(move |group| except.is_none_or(|id| str_field(group, "id") != id))
    };
    if let Some(name) = fields.name.filter(|name| !name.is_empty()) {
        if others().any(|group| str_field(group, "name").eq_ignore_ascii_case(name)) {
            return Err(SimError::invalid("name_already_exists"));
        }
    }
    if let Some(handle) = fields.handle.filter(|handle| !handle.is_empty()) {
        if others().any(|group| str_field(group, "handle").eq_ignore_ascii_case(handle)) {
            return Err(SimError::invalid("handle_already_exists"));
        }
    }
    Ok(())
}

/// Caller supplied date, or now.
fn stamp(date: Option<&str>) -> String {
    date.map(ToString::to_string).unwrap_or_else(now_ts)
}

fn group_mut<'a>(store: &'a mut SlackStore, id: &str) -> SimResult<&'a mut Entity> {
    if id.trim().is_empty() {
        return Err(SimError::invalid("invalid_usergroup_id"));
    }
    store
        .db
        .usergroups
        .get_mut(id)
        .ok_or_else(|| SimError::not_found("usergroup_not_found"))
}

pub fn create(store: &mut SlackStore, fields: &UsergroupFields<'_>) -> SimResult<Value> {
    let name = fields
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| SimError::invalid("invalid_name"))?;
    check_channels(store, fields.channel_ids.as_deref())?;
    check_unique(store, None, fields)?;

    let id = Uuid::new_v4().to_string();
    let group = store.db.usergroups.insert(object(json!({
        "id": id,
        "team_id": fields.team_id,
        "is_usergroup": true,
        "name": name,
        "handle": fields.handle,
        "description": fields.description,
        "date_create": now_ts(),
        "date_update": "",
        "date_delete": 0,
        "auto_type": null,
        "created_by": "",
        "updated_by": "",
        "deleted_by": null,
        "prefs": { "channels": fields.channel_ids.clone().unwrap_or_default(), "groups": [] },
        "users": [],
        "user_count": 0,
        "disabled": false,
    })));
    debug!(%id, %name, "usergroup created");
    Ok(json!({ "usergroup": group }))
}

/// `usergroups.list`. Counts and member lists are only included on request.
pub fn list(store: &SlackStore, params: &ListUsergroups<'_>) -> SimResult<Value> {
    let groups = store
        .db
        .usergroups
        .iter()
        .filter(|group| params.include_disabled || !bool_field(group, "disabled"))
        .filter(|group| params.team_id.is_none_or(|team| str_field(group, "team_id") == team))
        .map(|group| {
            let mut group = group.clone();
            if !params.include_count {
                group.remove("user_count");
            }
            if !params.include_users {
                group.remove("users");
            }
            Value::Object(group)
        })
        .collect::<Vec<_>>();
    Ok(json!({ "usergroups": groups }))
}

pub fn update(
    store: &mut SlackStore,
    usergroup_id: &str,
    fields: &UsergroupFields<'_>,
    date_update: Option<&str>,
) -> SimResult<Value> {
    group_mut(store, usergroup_id)?;
    check_unique(store, Some(usergroup_id), fields)?;
    check_channels(store, fields.channel_ids.as_deref())?;

    let group = group_mut(store, usergroup_id)?;
    if let Some(channels) = &fields.channel_ids {
        group.insert("prefs".to_string(), json!({ "channels": channels, "groups": [] }));
    }
    for (key, value) in [
        ("name", fields.name),
        ("handle", fields.handle),
        ("description", fields.description),
    ] {
        if let Some(value) = value {
            group.insert(key.to_string(), json!(value));
        }
    }
    group.insert("date_update".to_string(), json!(stamp(date_update)));
    group.insert("updated_by".to_string(), json!(""));
    debug!(%usergroup_id, "usergroup updated");
    Ok(json!({ "usergroup": group }))
}

pub fn disable(store: &mut SlackStore, usergroup_id: &str, date_delete: Option<&str>) -> SimResult<Value> {
    let group = group_mut(store, usergroup_id)?;
    if bool_field(group, "disabled") {
        return Err(SimError::invalid("usergroup_already_disabled"));
    }
    group.insert("disabled".to_string(), json!(true));
    group.insert("date_delete".to_string(), json!(stamp(date_delete)));
    group.insert("deleted_by".to_string(), json!(""));
    debug!(%usergroup_id, "usergroup disabled");
    Ok(json!({ "usergroup": group }))
}

pub fn enable(store: &mut SlackStore, usergroup_id: &str) -> SimResult<Value> {
    let group = group_mut(store, usergroup_id)?;
    group.insert("disabled".to_string(), json!(false));
    group.insert("date_delete".to_string(), json!(0));
    group.insert("deleted_by".to_string(), Value::Null);
    debug!(%usergroup_id, "usergroup enabled");
    Ok(json!({ "usergroup": group }))
}

/// `usergroups.users.update`: replaces the member list.
pub fn users_update(
    store: &mut SlackStore,
    usergroup_id: &str,
    user_ids: &[&str],
    date_update: Option<&str>,
) -> SimResult<Value> {
    if usergroup_id.trim().is_empty() {
        return Err(SimError::invalid("invalid_usergroup_id"));
    }
    if user_ids.is_empty() {
        return Err(SimError::invalid("invalid_user_ids"));
    }
    group_mut(store, usergroup_id)?;
    if user_ids.iter().any(|user| !store.user_exists(user)) {
        return Err(SimError::not_found("user_not_found"));
    }

    let group = group_mut(store, usergroup_id)?;
    group.insert("users".to_string(), json!(user_ids));
    group.insert("user_count".to_string(), json!(user_ids.len()));
    group.insert("updated_by".to_string(), json!(""));
    group.insert("date_update".to_string(), json!(stamp(date_update)));
    debug!(%usergroup_id, users = user_ids.len(), "usergroup members replaced");
    Ok(json!({ "usergroup": group }))
}

/// `usergroups.users.list`: the member user objects.
pub fn users_list(store: &SlackStore, usergroup_id: &str, include_disabled: bool) -> SimResult<Value> {
    if usergroup_id.trim().is_empty() {
        return Err(SimError::invalid("invalid_usergroup_id"));
    }
    let group = store
        .db
        .usergroups
        .get(usergroup_id)
        .ok_or_else(|| SimError::not_found("usergroup_not_found"))?;
    if !include_disabled && bool_field(group, "disabled") {
        return Ok(json!({ "users": [] }));
    }

    let users = group
        .get("users")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(|id| {
            store
                .db
                .users
                .get(id)
                .cloned()
                .ok_or_else(|| SimError::invalid("inconsistent_data"))
        })
        .collect::<SimResult<Vec<_>>>()?;
    Ok(json!({ "users": users }))
}
