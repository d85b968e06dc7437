use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::object;

use super::{SlackStore, hashed_id, require, split_list};

#[derive(Debug, Clone, Default)]
pub struct Invite<'a> {
    pub email: &'a str,
    pub channel_ids: Option<&'a str>,
    pub real_name: Option<&'a str>,
    pub team_id: Option<&'a str>,
}

/// `admin.users.invite`: registers the user and adds them to every listed
/// channel that exists.
pub fn invite(store: &mut SlackStore, params: &Invite<'_>) -> SimResult<Value> {
    let email = require(Some(params.email), "invalid_email")?;
    let taken = store.db.users.iter().any(|user| {
        user.get("profile")
            .and_then(|profile| profile.get("email"))
            .and_then(Value::as_str)
            == Some(email)
    });
    if taken {
        return Err(SimError::invalid("already_invited"));
    }

    let handle = email.split('@').next().unwrap_or(email);
    let capitalized = capitalize(handle);
    let id = hashed_id('U', email, |candidate| store.db.users.contains(candidate));
    let user = object(json!({
        "id": id,
        "team_id": params.team_id,
        "name": handle,
        "real_name": params.real_name.unwrap_or(&capitalized),
        "profile": {
            "email": email,
            "display_name": capitalized.chars().take(5).collect::<String>(),
            "image": "default_base64_image",
            "image_crop_x": 0,
            "image_crop_y": 0,
            "image_crop_w": 100,
            "title": "Invited User",
        },
        "is_admin": false,
        "is_bot": false,
        "deleted": false,
        "presence": "away",
    }));
    let user = store.db.users.insert(user).clone();

    for channel_id in params.channel_ids.map(split_list).unwrap_or_default() {
        if let Some(channel) = store.db.channel_mut(channel_id) {
            channel.conversations.members.push(id.clone());
        }
    }
    debug!(%id, %email, "user invited");
    Ok(json!({ "user": user }))
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_lowers_the_tail() {
        assert_eq!(capitalize("jOHN"), "John");
        assert_eq!(capitalize(""), "");
    }
}
