use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{SimError, SimResult};
use crate::query::{Connectives, FieldSpec, Matcher, Op, Schema, UnknownField, parse_comparison};
use crate::store::{Entity, object, str_field};

use super::{ChatStore, body_field, fresh_name, has_prefix, mask_fields, now, page_of, page_size};

const SPACE_TYPES: [&str; 3] = ["SPACE", "GROUP_CHAT", "DIRECT_MESSAGE"];
const MY_CUSTOMER: &str = "customers/my_customer";
const DESCRIPTION_LIMIT: usize = 150;

const SEARCH_SCHEMA: Schema = Schema::new(
    &[
        FieldSpec::new("display_name", "displayName", Matcher::Contains),
        FieldSpec::new("external_user_allowed", "externalUserAllowed", Matcher::Bool),
        FieldSpec::new("create_time", "createTime", Matcher::Ordered),
        FieldSpec::new("last_active_time", "lastActiveTime", Matcher::Ordered),
        FieldSpec::new("space_history_state", "spaceHistoryState", Matcher::Exact),
    ],
    UnknownField::MatchAll,
);

const PATCH_MASKS: [&str; 6] = [
    "space_details",
    "display_name",
    "space_type",
    "space_history_state",
    "access_settings.audience",
    "permission_settings",
];

#[derive(Debug, Clone, Default)]
pub struct ListSpaces<'a> {
    pub page_size: Option<usize>,
    pub page_token: Option<&'a str>,
    pub filter: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchSpaces<'a> {
    pub use_admin_access: bool,
    pub query: &'a str,
    pub page_size: Option<usize>,
    pub page_token: Option<&'a str>,
    pub order_by: Option<&'a str>,
}

/// Spaces the caller belongs to, optionally narrowed to some space types.
pub fn list(store: &ChatStore, params: &ListSpaces<'_>) -> SimResult<Value> {
    let wanted = match params.filter.map(str::trim) {
        None | Some("") => None,
        Some(filter) => Some(space_type_filter(filter)?),
    };

    let spaces = store
        .db
        .spaces
        .iter()
        .filter(|space| store.is_member(str_field(space, "name")))
        .filter(|space| {
            wanted
                .as_ref()
                .is_none_or(|types| types.iter().any(|t| t == str_field(space, "spaceType")))
        })
        .map(|space| Value::Object(space.clone()))
        .collect();

    let size = page_size(params.page_size, 100, 1000);
    Ok(page_of("spaces", spaces, params.page_token, size))
}

fn space_type_filter(filter: &str) -> SimResult<Vec<String>> {
    let query = parse_comparison(filter, Connectives::OR_ONLY)?;
    let mut types = Vec::new();
    for clause in query.clauses() {
        let field = clause.field.as_deref().unwrap_or("");
        if !matches!(field, "spaceType" | "space_type") || clause.op != Op::Eq {
            continue;
        }
        if !SPACE_TYPES.contains(&clause.value.as_str()) {
            return Err(SimError::invalid(format!(
                "Invalid space type: '{}'",
                clause.value
            )));
        }
        types.push(clause.value.clone());
    }

    if types.is_empty() {
        return Err(SimError::invalid("No valid expressions found."));
    }
    Ok(types)
}

/// Admin search across the customer's named spaces.
pub fn search(store: &ChatStore, params: &SearchSpaces<'_>) -> SimResult<Value> {
    if !params.use_admin_access {
        return Err(SimError::unsupported(
            "space search without admin access (useAdminAccess must be true)",
        ));
    }

    let query = parse_comparison(params.query, Connectives::AND_ONLY)?;
    if !query.values_of("customer").any(|value| value == MY_CUSTOMER) {
        return Err(SimError::invalid(format!(
            "query must include customer = \"{MY_CUSTOMER}\"."
        )));
    }
    if !query
        .values_of("space_type")
        .any(|value| value.eq_ignore_ascii_case("SPACE"))
    {
        return Err(SimError::invalid("query must include space_type = \"SPACE\"."));
    }

    let mut spaces = store
        .db
        .spaces
        .iter()
        .filter(|space| str_field(space, "customer").eq_ignore_ascii_case(MY_CUSTOMER))
        .filter(|space| str_field(space, "spaceType") == "SPACE")
        .map(|space| Value::Object(space.clone()))
        .filter(|space| query.matches(space, &SEARCH_SCHEMA))
        .collect::<Vec<_>>();

    let (field, descending) = sort_order(params.order_by);
    spaces.sort_by(|left, right| {
        let ordering = sort_key(left, &field).cmp(&sort_key(right, &field));
        if descending { ordering.reverse() } else { ordering }
    });

    let size = page_size(params.page_size, 100, 1000);
    Ok(page_of("spaces", spaces, params.page_token, size))
}

fn sort_order(order_by: Option<&str>) -> (String, bool) {
    let mut parts = order_by.unwrap_or("").split_whitespace();
    let field = parts.next().unwrap_or("create_time").to_lowercase();
    let descending = parts.next().is_some_and(|dir| dir.eq_ignore_ascii_case("DESC"));
    (field, descending)
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Count(i64),
    Time(String),
    Unsorted,
}

fn sort_key(space: &Value, field: &str) -> SortKey {
    let text = |key: &str| space.get(key).and_then(Value::as_str).unwrap_or("").to_string();
    match field {
        "membership_count.joined_direct_human_user_count" => SortKey::Count(
            space
                .get("membershipCount")
                .and_then(|count| {
                    count
                        .get("joinedDirectHumanUserCount")
                        .or_else(|| count.get("joined_direct_human_user_count"))
                })
                .and_then(Value::as_i64)
                .unwrap_or(0),
        ),
        "last_active_time" => SortKey::Time(text("lastActiveTime")),
        "create_time" => SortKey::Time(text("createTime")),
        _ => SortKey::Unsorted,
    }
}

/// Non-admin callers only see spaces they are a member of.
pub fn get(store: &ChatStore, name: &str, use_admin_access: bool) -> SimResult<Value> {
    let space = store
        .db
        .spaces
        .get(name)
        .ok_or_else(|| SimError::not_found(format!("space {name}")))?;
    if !use_admin_access && !store.is_member(name) {
        return Err(SimError::not_found(format!(
            "space {name} for {}",
            store.current_user()
        )));
    }
    Ok(Value::Object(space.clone()))
}

/// Creates a space and, unless importing or creating a bot DM, makes the caller
/// its manager. Repeating a `request_id` returns the space it created.
pub fn create(store: &mut ChatStore, space: Value, request_id: Option<&str>) -> SimResult<Value> {
    if let Some(existing) = request_id
        .and_then(|id| store.db.request_ids.get(id))
        .and_then(|name| store.db.spaces.get(name))
    {
        debug!(name = str_field(existing, "name"), "space create replayed");
        return Ok(Value::Object(existing.clone()));
    }

    let mut space = object(space);
    let space_type = str_field(&space, "spaceType").to_string();
    let display_name = str_field(&space, "displayName").trim().to_string();
    if space_type.is_empty() {
        return Err(SimError::invalid("spaceType is required."));
    }
    if space_type == "SPACE" {
        if display_name.is_empty() {
            return Err(SimError::invalid(
                "displayName is required when spaceType is SPACE",
            ));
        }
        if display_name_taken(store, &display_name) {
            return Err(SimError::invalid(format!(
                "A space with displayName '{display_name}' already exists."
            )));
        }
    }

    let name = fresh_name(&mut store.db.spaces, |n| format!("spaces/SPACE_{n}"));
    space.insert("name".to_string(), json!(name));
    for flag in ["singleUserBotDm", "externalUserAllowed", "importMode"] {
        space.entry(flag.to_string()).or_insert(json!(false));
    }
    space.insert("createTime".to_string(), json!(now()));

    let import_mode = space.get("importMode").and_then(Value::as_bool) == Some(true);
    let bot_dm = space_type == "DIRECT_MESSAGE"
        && space.get("singleUserBotDm").and_then(Value::as_bool) == Some(true);
    let created = store.db.spaces.insert(space).clone();
    info!(%name, "space created");

    if !import_mode && !bot_dm {
        let caller = store.current_user().to_string();
        let membership = object(json!({
            "name": store.membership_name(&name),
            "state": "JOINED",
            "role": "ROLE_MANAGER",
            "member": {
                "name": caller,
                "displayName": store.display_name(&caller),
                "type": "HUMAN",
            },
            "createTime": now(),
        }));
        store.db.memberships.insert(membership);
    }
    if let Some(id) = request_id {
        store.db.request_ids.insert(id.to_string(), name);
    }

    Ok(Value::Object(created))
}

fn display_name_taken(store: &ChatStore, display_name: &str) -> bool {
    store.db.spaces.iter().any(|space| {
        str_field(space, "displayName")
            .trim()
            .eq_ignore_ascii_case(display_name)
    })
}

/// Creates a space and invites the listed members. The caller is never invited.
pub fn setup(store: &mut ChatStore, request: Value) -> SimResult<Value> {
    let space = create(store, request.get("space").cloned().unwrap_or(json!({})), None)?;
    let space_name = space
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let requested = request
        .get("memberships")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for membership in requested {
        let mut membership = object(membership);
        let member = membership
            .get("member")
            .and_then(|member| member.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();
        if member.is_empty() || member.eq_ignore_ascii_case(store.current_user()) {
            continue;
        }

        let name = format!("{space_name}/members/{member}");
        membership.insert("name".to_string(), json!(name));
        membership.entry("role").or_insert(json!("ROLE_MEMBER"));
        membership.entry("state").or_insert(json!("INVITED"));
        membership.entry("createTime").or_insert(json!(now()));
        debug!(%name, "member invited");
        store.db.memberships.insert(membership);
    }

    Ok(space)
}

/// Applies the masked fields of `updates`. Masks that do not apply to the
/// space are skipped. Nothing is stored unless every mask succeeds.
pub fn patch(
    store: &mut ChatStore,
    name: &str,
    update_mask: &str,
    updates: Value,
    use_admin_access: bool,
) -> SimResult<Value> {
    let mut space = store
        .db
        .spaces
        .get(name)
        .cloned()
        .ok_or_else(|| SimError::not_found(format!("space {name}")))?;

    for mask in mask_fields(update_mask, &PATCH_MASKS) {
        let is_space = str_field(&space, "spaceType") == "SPACE";
        match mask.as_str() {
            "space_details" => {
                if let Some(description) = updates
                    .get("spaceDetails")
                    .and_then(|details| details.get("description"))
                    .and_then(Value::as_str)
                {
                    let trimmed = description.chars().take(DESCRIPTION_LIMIT).collect::<String>();
                    set_nested(&mut space, "spaceDetails", "description", json!(trimmed));
                }
            }
            "display_name" if is_space => {
                if let Some(display_name) = updates.get("displayName") {
                    space.insert("displayName".to_string(), display_name.clone());
                }
            }
            "space_type" => {
                let current = str_field(&space, "spaceType");
                let requested = updates.get("spaceType").and_then(Value::as_str);
                if current == "GROUP_CHAT" && requested == Some("SPACE") {
                    let display_name = updates
                        .get("displayName")
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .unwrap_or("");
                    if display_name.is_empty() {
                        return Err(SimError::invalid(
                            "displayName must be non-empty when changing space_type.",
                        ));
                    }
                    space.insert("spaceType".to_string(), json!("SPACE"));
                    space.insert("displayName".to_string(), json!(display_name));
                } else {
                    debug!(%name, "only GROUP_CHAT to SPACE type changes apply");
                }
            }
            "space_history_state" => {
                if let Some(state) = updates.get("spaceHistoryState") {
                    space.insert("spaceHistoryState".to_string(), state.clone());
                }
            }
            "access_settings.audience" if is_space => {
                if let Some(audience) = updates
                    .get("accessSettings")
                    .and_then(|settings| settings.get("audience"))
                {
                    set_nested(&mut space, "accessSettings", "audience", audience.clone());
                }
            }
            "permission_settings" => {
                if let Some(settings) = body_field(&updates, "permission_settings", "permissionSettings")
                {
                    space.insert("permissionSettings".to_string(), settings.clone());
                }
            }
            other => debug!(mask = other, "space update mask skipped"),
        }
    }

    let patched = store.db.spaces.insert(space).clone();
    debug!(%name, use_admin_access, "space patched");
    Ok(Value::Object(patched))
}

fn set_nested(entity: &mut Entity, field: &str, key: &str, value: Value) {
    match entity.get_mut(field) {
        Some(Value::Object(map)) => {
            map.insert(key.to_string(), value);
        }
        _ => {
            entity.insert(field.to_string(), json!({ key: value }));
        }
    }
}

/// Deletes the space with every membership, message, reaction and attachment under it.
pub fn delete(store: &mut ChatStore, name: &str, use_admin_access: bool) -> SimResult<Value> {
    if !store.db.spaces.contains(name) {
        return Err(SimError::not_found(format!("space {name}")));
    }
    if !use_admin_access && !store.is_member(name) {
        return Err(SimError::not_found(format!(
            "space {name} for {}",
            store.current_user()
        )));
    }

    store.db.spaces.delete(name);
    let prefix = format!("{name}/");
    let db = &mut store.db;
    let memberships = db.memberships.retain(|m| !has_prefix(m, &prefix));
    let messages = db.messages.retain(|m| !has_prefix(m, &prefix));
    let reactions = db.reactions.retain(|r| !has_prefix(r, &prefix));
    db.attachments.retain(|a| !has_prefix(a, &prefix));
    db.request_ids.retain(|_, space| space.as_str() != name);

    info!(%name, memberships, messages, reactions, "space deleted");
    Ok(json!({}))
}
