//! SCIM 2.0 user directory.

use std::sync::LazyLock;

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, str_field};

use super::WorkdayStore;

const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
const LIST_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// `attribute op "value"`, e.g. `userName eq "ada"` or `title pr`.
static FILTER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*([a-z][\w.]*)\s+(eq|ne|co|sw|ew|pr)(?:\s+"([^"]*)")?\s*$"#).ok()
});

#[derive(Debug, Clone, Default)]
pub struct ListUsers<'a> {
    /// Comma-separated attributes to return. `id` is always included.
    pub attributes: Option<&'a str>,
    pub filter: Option<&'a str>,
    /// 1-based index of the first result.
    pub start_index: Option<usize>,
    pub count: Option<usize>,
    pub sort_by: Option<&'a str>,
    /// `ascending` (default) or `descending`.
    pub sort_order: Option<&'a str>,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn not_found(id: &str) -> SimError {
    SimError::not_found(format!("User {id} not found"))
}

/// Values at a dotted path. Arrays on the way are searched element-wise.
fn values_at<'v>(value: &'v Value, path: &str) -> Vec<&'v Value> {
    let mut current = vec![value];
    for segment in path.split('.') {
        current = current
            .into_iter()
            .flat_map(|value| match value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .filter_map(|value| {
                value.as_object().and_then(|object| {
                    object
                        .iter()
                        .find(|(name, _)| name.eq_ignore_ascii_case(segment))
                        .map(|(_, found)| found)
                })
            })
            .collect();
    }
    current
}

fn text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Applies a SCIM filter. Anything that does not parse is matched as a
/// substring of the serialized user.
fn accepts(user: &Entity, filter: &str) -> bool {
    let value = Value::Object(user.clone());
    let Some(captures) = FILTER.as_ref().and_then(|pattern| pattern.captures(filter)) else {
        return value.to_string().contains(filter);
    };

    let found = values_at(&value, &captures[1]);
    let operator = captures[2].to_ascii_lowercase();
    let wanted = captures.get(3).map_or("", |m| m.as_str()).to_lowercase();
    if operator == "pr" {
        return found.iter().any(|value| !value.is_null());
    }
    if operator == "ne" {
        return !found.iter().any(|value| text(value).to_lowercase() == wanted);
    }
    found.iter().any(|value| {
        let candidate = text(value).to_lowercase();
        match operator.as_str() {
            "eq" => candidate == wanted,
            "co" => candidate.contains(&wanted),
            "sw" => candidate.starts_with(&wanted),
            _ => candidate.ends_with(&wanted),
        }
    })
}

fn sort_key(user: &Entity, attribute: &str) -> String {
    values_at(&Value::Object(user.clone()), attribute)
        .first()
        .map(|value| text(value))
        .unwrap_or_default()
}

fn project(user: &Entity, attributes: Option<&str>) -> Value {
    let Some(attributes) = attributes else {
        return Value::Object(user.clone());
    };
    let projected = user
        .iter()
        .filter(|(name, _)| {
            name.as_str() == "id"
                || attributes
                    .split(',')
                    .any(|wanted| wanted.trim().eq_ignore_ascii_case(name))
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect::<Map<_, _>>();
    Value::Object(projected)
}

/// `GET /scim/v2/Users` as a ListResponse.
pub fn list_users(store: &WorkdayStore, params: &ListUsers<'_>) -> SimResult<Value> {
    let mut users = store
        .db
        .scim
        .users
        .iter()
        .filter(|user| params.filter.is_none_or(|filter| accepts(user, filter)))
        .collect::<Vec<_>>();

    if let Some(attribute) = params.sort_by {
        let descending = params
            .sort_order
            .is_some_and(|order| order.eq_ignore_ascii_case("descending"));
        users.sort_by(|left, right| {
            let ordering = sort_key(left, attribute).cmp(&sort_key(right, attribute));
            if descending { ordering.reverse() } else { ordering }
        });
    }

    let total = users.len();
    let start = params.start_index.unwrap_or(1).max(1);
    let count = params.count.unwrap_or(total);
    let resources = users
        .into_iter()
        .skip(start - 1)
        .take(count)
        .map(|user| project(user, params.attributes))
        .collect::<Vec<_>>();

    Ok(json!({
        "schemas": [LIST_SCHEMA],
        "totalResults": total,
        "startIndex": start,
        "itemsPerPage": resources.len(),
        "Resources": resources,
    }))
}

/// Creates a user. `userName` must be present and unused.
pub fn create_user(store: &mut WorkdayStore, body: Value) -> SimResult<Value> {
    let mut user = super::body(body)?;
    let user_name = str_field(&user, "userName").to_string();
    if user_name.is_empty() {
        return Err(SimError::invalid("userName is required"));
    }
    let users = &mut store.db.scim.users;
    if users
        .iter()
        .any(|existing| str_field(existing, "userName").eq_ignore_ascii_case(&user_name))
    {
        return Err(SimError::invalid(format!("userName {user_name} already exists")));
    }

    let id = users.next_id().to_string();
    let created = now();
    user.insert("id".to_string(), json!(id));
    user.entry("schemas".to_string())
        .or_insert_with(|| json!([USER_SCHEMA]));
    user.insert(
        "meta".to_string(),
        json!({ "resourceType": "User", "created": created, "lastModified": created }),
    );
    let stored = users.insert(user).clone();
    debug!(%id, %user_name, "scim user created");
    Ok(Value::Object(stored))
}

pub fn get_user(store: &WorkdayStore, id: &str, attributes: Option<&str>) -> SimResult<Value> {
    let user = store.db.scim.users.get(id).ok_or_else(|| not_found(id))?;
    Ok(project(user, attributes))
}

fn touch(user: &mut Entity) {
    if let Some(Value::Object(meta)) = user.get_mut("meta") {
        meta.insert("lastModified".to_string(), json!(now()));
    }
}

fn set_path(user: &mut Entity, path: &str, value: Value) {
    let mut segments = path.split('.').collect::<Vec<_>>();
    let Some(last) = segments.pop() else {
        return;
    };
    let mut target = user;
    for segment in segments {
        let slot = target
            .entry(segment.to_string())
            .or_insert_with(|| json!({}));
        if !slot.is_object() {
            *slot = json!({});
        }
        let Value::Object(next) = slot else {
            return;
        };
        target = next;
    }
    target.insert(last.to_string(), value);
}

fn remove_path(user: &mut Entity, path: &str) {
    match path.split_once('.') {
        None => {
            user.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(inner)) = user.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

/// Applies `Operations` (`add`, `replace`, `remove`). The id never changes.
pub fn patch_user(store: &mut WorkdayStore, id: &str, body: Value) -> SimResult<Value> {
    let operations = match body.get("Operations") {
        Some(Value::Array(operations)) => operations.clone(),
        _ => return Err(SimError::invalid("Operations are required")),
    };
    let user = store.db.scim.users.get_mut(id).ok_or_else(|| not_found(id))?;

    let mut patched = user.clone();
    for operation in &operations {
        let op = operation.get("op").and_then(Value::as_str).unwrap_or_default();
        let path = operation.get("path").and_then(Value::as_str);
        if path.is_some_and(|path| path.eq_ignore_ascii_case("id")) {
            continue;
        }
        let value = operation.get("value").cloned().unwrap_or(Value::Null);
        match (op.to_ascii_lowercase().as_str(), path) {
            ("add" | "replace", Some(path)) => set_path(&mut patched, path, value),
            ("add" | "replace", None) => match value {
                Value::Object(fields) => {
                    for (name, field) in fields.into_iter().filter(|(name, _)| name != "id") {
                        patched.insert(name, field);
                    }
                }
                _ => return Err(SimError::invalid("value must be an object when path is absent")),
            },
            ("remove", Some(path)) => remove_path(&mut patched, path),
            ("remove", None) => return Err(SimError::invalid("remove requires a path")),
            (other, _) => return Err(SimError::invalid(format!("unsupported patch op {other}"))),
        }
    }

    touch(&mut patched);
    *user = patched;
    debug!(%id, operations = operations.len(), "scim user patched");
    Ok(Value::Object(user.clone()))
}

/// Replaces the user. `id` and `meta.created` survive.
pub fn replace_user(store: &mut WorkdayStore, id: &str, body: Value) -> SimResult<Value> {
    let mut replacement = super::body(body)?;
    let user = store.db.scim.users.get_mut(id).ok_or_else(|| not_found(id))?;

    replacement.insert("id".to_string(), json!(id));
    if let Some(meta) = user.get("meta").cloned() {
        replacement.insert("meta".to_string(), meta);
    }
    touch(&mut replacement);
    *user = replacement;
    debug!(%id, "scim user replaced");
    Ok(Value::Object(user.clone()))
}

pub fn delete_user(store: &mut WorkdayStore, id: &str) -> SimResult<Value> {
    store.db.scim.users.delete(id).ok_or_else(|| not_found(id))?;
    debug!(%id, "scim user deleted");
    Ok(Value::Null)
}

pub fn schemas(store: &WorkdayStore) -> SimResult<Value> {
    Ok(json!(store.db.scim.schemas))
}

/// A schema by its URI.
pub fn schema(store: &WorkdayStore, uri: &str) -> SimResult<Value> {
    store
        .db
        .scim
        .schemas
        .iter()
        .find(|schema| str_field(schema, "id") == uri || str_field(schema, "uri") == uri)
        .cloned()
        .map(Value::Object)
        .ok_or_else(|| SimError::not_found(format!("Schema {uri} not found")))
}

pub fn resource_types(store: &WorkdayStore) -> SimResult<Value> {
    Ok(json!(store.db.scim.resource_types))
}

/// A resource type by name (`User`, ...).
pub fn resource_type(store: &WorkdayStore, resource: &str) -> SimResult<Value> {
    store
        .db
        .scim
        .resource_types
        .iter()
        .find(|kind| {
            [str_field(kind, "resource"), str_field(kind, "name"), str_field(kind, "id")]
                .iter()
                .any(|name| *name == resource)
        })
        .cloned()
        .map(Value::Object)
        .ok_or_else(|| SimError::not_found(format!("Resource type {resource} not found")))
}

pub fn service_provider_config(store: &WorkdayStore) -> SimResult<Value> {
    Ok(Value::Object(store.db.scim.service_provider_config.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::object;

    #[test]
    fn filters_follow_scim_operators() {
        let user = object(json!({
            "userName": "Ada",
            "name": { "familyName": "Lovelace" },
            "emails": [{ "value": "ada@example.com" }],
        }));
        assert!(accepts(&user, r#"userName eq "ada""#));
        assert!(accepts(&user, r#"name.familyName sw "love""#));
        assert!(accepts(&user, r#"emails.value ew "example.com""#));
        assert!(accepts(&user, "title ne \"boss\""));
        assert!(!accepts(&user, "title pr"));
        assert!(accepts(&user, "Lovelace"));
    }

    #[test]
    fn nested_paths_are_created_on_demand() {
        let mut user = object(json!({ "name": "flat" }));
        set_path(&mut user, "name.givenName", json!("Ada"));
        set_path(&mut user, "title", json!("Countess"));
        assert_eq!(user["name"], json!({ "givenName": "Ada" }));

        remove_path(&mut user, "name.givenName");
        assert_eq!(user["name"], json!({}));
    }
}
