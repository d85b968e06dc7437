use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::query::{Clause, Connectives, FieldSpec, Matcher, Op, Schema, UnknownField, parse_comparison};
use crate::store::{Entity, object, str_field};

use super::{ChatStore, has_prefix, now, page_of, page_size};

const APP_SUFFIX: &str = "/members/app";

const FILTER_SCHEMA: Schema = Schema::new(
    &[
        FieldSpec::new("role", "role", Matcher::Exact),
        FieldSpec::new("member.type", "member.type", Matcher::Exact),
    ],
    UnknownField::MatchAll,
);

#[derive(Debug, Clone, Default)]
pub struct ListMembers<'a> {
    pub page_size: Option<usize>,
    pub page_token: Option<&'a str>,
    pub filter: Option<&'a str>,
    pub show_groups: Option<bool>,
    pub show_invited: Option<bool>,
    pub use_admin_access: bool,
}

/// Memberships of the `parent` space.
///
/// With admin access the filter must restrict results to humans and the app
/// membership is hidden.
pub fn list(store: &ChatStore, parent: &str, params: &ListMembers<'_>) -> SimResult<Value> {
    if !parent.starts_with("spaces/") {
        return Err(SimError::invalid(format!(
            "invalid parent {parent}, expected spaces/{{space}}"
        )));
    }

    let query = match params.filter.map(str::trim) {
        None | Some("") => None,
        Some(filter) => Some(parse_comparison(filter, Connectives::BOTH)?),
    };
    if params.use_admin_access
        && !query
            .as_ref()
            .is_some_and(|query| query.clauses().any(humans_only))
    {
        return Err(SimError::invalid(
            "When using admin access, filter must include member.type = \"HUMAN\" or member.type != \"BOT\".",
        ));
    }

    let prefix = format!("{parent}/members/");
    let memberships = store
        .db
        .memberships
        .iter()
        .filter(|membership| has_prefix(membership, &prefix))
        .filter(|membership| !(params.use_admin_access && is_app(membership)))
        .filter(|membership| {
            params.show_groups != Some(false) || !member_name(membership).starts_with("groups/")
        })
        .filter(|membership| {
            params.show_invited != Some(false)
                || !str_field(membership, "state").eq_ignore_ascii_case("INVITED")
        })
        .map(|membership| Value::Object(membership.clone()))
        .filter(|membership| {
            query
                .as_ref()
                .is_none_or(|query| query.matches(membership, &FILTER_SCHEMA))
        })
        .collect();

    let size = page_size(params.page_size, 100, 1000);
    Ok(page_of("memberships", memberships, params.page_token, size))
}

fn humans_only(clause: &Clause) -> bool {
    clause.field.as_deref() == Some("member.type")
        && match clause.op {
            Op::Eq => clause.value.eq_ignore_ascii_case("HUMAN"),
            Op::Ne => clause.value.eq_ignore_ascii_case("BOT"),
            _ => false,
        }
}

pub fn get(store: &ChatStore, name: &str, use_admin_access: bool) -> SimResult<Value> {
    let membership = store
        .db
        .memberships
        .get(name)
        .ok_or_else(|| SimError::not_found(format!("membership {name}")))?;
    if use_admin_access && is_app(membership) {
        return Err(SimError::unsupported("admin access to the app membership"));
    }
    Ok(Value::Object(membership.clone()))
}

/// Invites a user into the space. An existing membership is returned as is.
pub fn create(
    store: &mut ChatStore,
    parent: &str,
    membership: Value,
    use_admin_access: bool,
) -> SimResult<Value> {
    let parts = parent.split('/').collect::<Vec<_>>();
    if parts.len() != 2 || parts[0] != "spaces" {
        return Err(SimError::invalid(format!(
            "invalid parent {parent}, expected spaces/{{space}}"
        )));
    }

    let mut membership = object(membership);
    let member = membership
        .get("member")
        .and_then(|member| member.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| SimError::invalid("member.name is required"))?
        .to_string();
    if !member.starts_with("users/") {
        return Err(SimError::invalid("member name must start with 'users/'."));
    }
    let is_bot = membership
        .get("member")
        .and_then(|member| member.get("type"))
        .and_then(Value::as_str)
        == Some("BOT");
    if use_admin_access && is_bot {
        return Err(SimError::unsupported("admin access to add a Chat app"));
    }

    let name = format!("{parent}/members/{member}");
    if let Some(existing) = store.db.memberships.get(&name) {
        debug!(%name, "membership already exists");
        return Ok(Value::Object(existing.clone()));
    }

    membership.insert("name".to_string(), json!(name));
    membership.entry("role").or_insert(json!("ROLE_MEMBER"));
    membership.entry("state").or_insert(json!("INVITED"));
    membership.entry("createTime").or_insert(json!(now()));
    debug!(%name, "membership created");
    Ok(Value::Object(store.db.memberships.insert(membership).clone()))
}

pub fn patch(
    _store: &mut ChatStore,
    name: &str,
    _update_mask: &str,
    _membership: Value,
    _use_admin_access: bool,
) -> SimResult<Value> {
    Err(SimError::unsupported(format!("spaces.members.patch on {name}")))
}

/// Removes the membership and returns it.
pub fn delete(store: &mut ChatStore, name: &str, use_admin_access: bool) -> SimResult<Value> {
    let membership = store
        .db
        .memberships
        .get(name)
        .ok_or_else(|| SimError::not_found(format!("membership {name}")))?;
    if use_admin_access && is_app(membership) {
        return Err(SimError::unsupported("admin deletion of the app membership"));
    }

    let removed = store
        .db
        .memberships
        .delete(name)
        .ok_or_else(|| SimError::not_found(format!("membership {name}")))?;
    debug!(%name, "membership deleted");
    Ok(Value::Object(removed))
}

fn is_app(membership: &Entity) -> bool {
    str_field(membership, "name").ends_with(APP_SUFFIX)
}

fn member_name(membership: &Entity) -> &str {
    membership
        .get("member")
        .and_then(|member| member.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("")
}
