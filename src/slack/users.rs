use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, str_field};

use super::conversations::{ListConversations, requested_types};
use super::{SlackStore, cursor_page, require, to_json};

const PRESENCES: [&str; 2] = ["active", "away"];
const CROP_FIELDS: [&str; 3] = ["image_crop_x", "image_crop_y", "image_crop_w"];

#[derive(Debug, Clone, Copy, Default)]
pub struct Crop {
    pub x: i64,
    pub y: i64,
    pub w: i64,
}

fn user<'a>(store: &'a SlackStore, user_id: &str) -> SimResult<&'a Entity> {
    store
        .db
        .users
        .get(user_id)
        .ok_or_else(|| SimError::not_found("user_not_found"))
}

fn user_mut<'a>(store: &'a mut SlackStore, user_id: &str) -> SimResult<&'a mut Entity> {
    store
        .db
        .users
        .get_mut(user_id)
        .ok_or_else(|| SimError::not_found("user_not_found"))
}

/// Applies `change` to the user's profile, creating it when missing, and
/// returns the updated profile.
fn edit_profile(user: &mut Entity, change: impl FnOnce(&mut Entity)) -> Entity {
    let mut profile = match user.remove("profile") {
        Some(Value::Object(profile)) => profile,
        _ => Entity::new(),
    };
    change(&mut profile);
    user.insert("profile".to_string(), Value::Object(profile.clone()));
    profile
}

pub fn info(store: &SlackStore, user_id: &str, include_locale: bool) -> SimResult<Value> {
    let user_id = require(Some(user_id), "invalid_user_id")?;
    let mut found = user(store, user_id)?.clone();
    if include_locale {
        found.insert("locale".to_string(), json!("en-US"));
    }
    Ok(json!({ "user": found }))
}

/// `users.list`, optionally restricted to one team.
pub fn list(
    store: &SlackStore,
    cursor: Option<&str>,
    include_locale: bool,
    limit: Option<usize>,
    team_id: Option<&str>,
) -> SimResult<Value> {
    let users = store
        .db
        .users
        .iter()
        .filter(|user| team_id.is_none_or(|team| str_field(user, "team_id") == team))
        .cloned()
        .map(|mut user| {
            if include_locale {
                user.insert("locale".to_string(), json!("en-US"));
            }
            user
        })
        .collect::<Vec<_>>();

    let page = cursor_page(users, cursor, limit.unwrap_or(100))?;
    Ok(json!({
        "members": page.items,
        "response_metadata": { "next_cursor": page.next_page_token },
    }))
}

pub fn identity(store: &SlackStore, user_id: &str) -> SimResult<Value> {
    let user_id = require(Some(user_id), "missing_user_id")?;
    let found = user(store, user_id)?;
    Ok(json!({
        "user": { "id": found.get("id"), "name": found.get("name") },
        "team": { "id": found.get("team_id") },
    }))
}

pub fn lookup_by_email(store: &SlackStore, email: &str) -> SimResult<Value> {
    let email = require(Some(email), "invalid_email")?;
    store
        .db
        .users
        .iter()
        .find(|user| {
            user.get("profile")
                .and_then(|profile| profile.get("email"))
                .and_then(Value::as_str)
                == Some(email)
        })
        .map(|user| json!({ "user": user }))
        .ok_or_else(|| SimError::not_found("users_not_found"))
}

pub fn get_presence(store: &SlackStore, user_id: &str) -> SimResult<Value> {
    let user_id = require(Some(user_id), "invalid_user_id")?;
    let found = user(store, user_id)?;
    let presence = found.get("presence").and_then(Value::as_str).unwrap_or("away");
    Ok(json!({ "presence": presence }))
}

pub fn set_presence(store: &mut SlackStore, user_id: &str, presence: &str) -> SimResult<Value> {
    let user_id = require(Some(user_id), "missing_user_id")?;
    if !PRESENCES.contains(&presence) {
        return Err(SimError::invalid("invalid_presence"));
    }
    user_mut(store, user_id)?.insert("presence".to_string(), json!(presence));
    debug!(%user_id, %presence, "presence set");
    Ok(json!({}))
}

/// `users.setPhoto`. Crop values are stored only when all three are given.
pub fn set_photo(store: &mut SlackStore, user_id: &str, image: &str, crop: Option<Crop>) -> SimResult<Value> {
    let user_id = require(Some(user_id), "missing_user_id")?;
    let image = require(Some(image), "missing_image")?;
    if crop.is_some_and(|crop| crop.x < 0 || crop.y < 0 || crop.w < 0) {
        return Err(SimError::invalid("invalid_crop_params"));
    }

    edit_profile(user_mut(store, user_id)?, |profile| {
        profile.insert("image".to_string(), json!(image));
        if let Some(crop) = crop {
            for (field, value) in CROP_FIELDS.into_iter().zip([crop.x, crop.y, crop.w]) {
                profile.insert(field.to_string(), json!(value));
            }
        }
    });
    debug!(%user_id, "photo set");
    Ok(json!({}))
}

pub fn delete_photo(store: &mut SlackStore, user_id: &str) -> SimResult<Value> {
    let user_id = require(Some(user_id), "missing_user_id")?;
    let profile = store
        .db
        .users
        .get_mut(user_id)
        .and_then(|user| user.get_mut("profile"))
        .and_then(Value::as_object_mut)
        .filter(|profile| profile.contains_key("image"))
        .ok_or_else(|| SimError::invalid("no_photo_to_delete"))?;

    profile.remove("image");
    for field in CROP_FIELDS {
        profile.remove(field);
    }
    debug!(%user_id, "photo deleted");
    Ok(json!({}))
}

/// `users.profile.set`: merges `profile` into the stored profile.
pub fn set_profile(store: &mut SlackStore, user_id: &str, profile: Value) -> SimResult<Value> {
    let changes = match profile {
        Value::Object(changes) if !changes.is_empty() => changes,
        _ => return Err(SimError::invalid("invalid_profile")),
    };
    let user_id = require(Some(user_id), "invalid_user_id")?;

    let profile = edit_profile(user_mut(store, user_id)?, |profile| profile.extend(changes));
    debug!(%user_id, "profile updated");
    Ok(json!({ "profile": profile }))
}

/// `users.conversations`: channels of the requested types the user is a member of.
pub fn conversations(store: &SlackStore, user_id: &str, params: &ListConversations<'_>) -> SimResult<Value> {
    let user_id = require(Some(user_id), "missing_user_id")?;
    let types = match params.types {
        Some(_) => requested_types(params.types)?,
        None => vec!["public_channel", "private_channel", "mpim", "im"],
    };

    let channels = store
        .db
        .channels
        .iter()
        .filter(|channel| types.iter().any(|kind| *kind == channel.kind()))
        .filter(|channel| !(params.exclude_archived && channel.is_archived))
        .filter(|channel| channel.is_member(user_id))
        .map(to_json)
        .collect::<Vec<_>>();

    let page = cursor_page(channels, params.cursor, params.limit.unwrap_or(100))?;
    Ok(json!({
        "channels": page.items,
        "response_metadata": { "next_cursor": page.next_page_token },
    }))
}
