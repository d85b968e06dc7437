//! Google Chat `spaces.*`, `media.*` and `users.*` resources.
//!
//! Every entity is addressed by its hierarchical `name`, for example
//! `spaces/SPACE_1/messages/client-42`. Calls act on behalf of the store's
//! current user.

pub mod attachments;
pub mod media;
pub mod members;
pub mod messages;
pub mod reactions;
pub mod space_events;
pub mod spaces;
pub mod users;

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::error::{SimError, SimResult};
use crate::store::{Collection, Entity, MissingFile, VendorStore, object, paginate, parse_token};

pub const DEFAULT_USER: &str = "users/user123";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDb {
    #[serde(rename = "User", default = "named")]
    pub users: Collection,
    #[serde(rename = "Space", default = "named")]
    pub spaces: Collection,
    #[serde(rename = "Message", default = "named")]
    pub messages: Collection,
    #[serde(rename = "Membership", default = "named")]
    pub memberships: Collection,
    #[serde(rename = "Reaction", default = "named")]
    pub reactions: Collection,
    #[serde(rename = "Attachment", default = "named")]
    pub attachments: Collection,
    #[serde(rename = "SpaceReadState", default = "named")]
    pub space_read_states: Collection,
    #[serde(rename = "ThreadReadState", default = "named")]
    pub thread_read_states: Collection,
    #[serde(rename = "SpaceNotificationSetting", default = "named")]
    pub notification_settings: Collection,
    #[serde(rename = "SpaceEvent", default = "named")]
    pub space_events: Collection,
    /// `requestId` of every `spaces.create` call, mapped to the space it created.
    #[serde(rename = "RequestIds", default)]
    pub request_ids: BTreeMap<String, String>,
}

fn named() -> Collection {
    Collection::keyed("name")
}

impl Default for ChatDb {
    fn default() -> Self {
        Self {
            users: named(),
            spaces: named(),
            messages: named(),
            memberships: named(),
            reactions: named(),
            attachments: named(),
            space_read_states: named(),
            thread_read_states: named(),
            notification_settings: named(),
            space_events: named(),
            request_ids: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatStore {
    db: ChatDb,
    current_user: String,
}

impl VendorStore for ChatStore {
    type Db = ChatDb;

    const VENDOR: &'static str = "chat";
    const MISSING_FILE: MissingFile = MissingFile::Error;

    fn from_db(db: ChatDb) -> Self {
        Self {
            db,
            current_user: DEFAULT_USER.to_string(),
        }
    }

    fn db(&self) -> &ChatDb {
        &self.db
    }

    fn db_mut(&mut self) -> &mut ChatDb {
        &mut self.db
    }

    fn seeded() -> ChatDb {
        let mut db = ChatDb::default();
        db.users.insert(object(json!({
            "name": DEFAULT_USER,
            "displayName": "abc",
            "domainId": "",
            "type": "HUMAN",
            "isAnonymous": false,
        })));
        db.spaces.insert(object(json!({
            "name": "spaces/AAAAAAAAA",
            "type": "ROOM",
            "spaceType": "SPACE",
            "singleUserBotDm": false,
            "threaded": false,
            "displayName": "My Space Name",
            "externalUserAllowed": true,
            "spaceThreadingState": "UNTHREADED_MESSAGES",
            "spaceDetails": {
                "description": "Description of the space.",
                "guidelines": "Guidelines for the space.",
            },
            "spaceHistoryState": "HISTORY_ON",
            "importMode": false,
            "createTime": "2023-10-27T12:00:00.000Z",
            "lastActiveTime": "2023-10-27T13:00:00.000Z",
            "adminInstalled": false,
            "membershipCount": { "joinedDirectHumanUserCount": 1, "joinedGroupCount": 0 },
            "accessSettings": { "accessState": "PRIVATE", "audience": "audiences/default" },
            "spaceUri": "https://example.com/spaces/AAAAAAAAA",
            "predefinedPermissionSettings": "COLLABORATION_SPACE",
        })));
        db.memberships.insert(object(json!({
            "name": format!("spaces/AAAAAAAAA/members/{DEFAULT_USER}"),
            "state": "JOINED",
            "role": "ROLE_MANAGER",
            "member": { "name": DEFAULT_USER, "displayName": "abc", "type": "HUMAN" },
            "createTime": "2023-10-27T12:00:00.000Z",
        })));
        db
    }
}

impl ChatStore {
    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    pub(crate) fn set_current_user(&mut self, user: &str) {
        self.current_user = user.to_string();
    }

    pub(crate) fn membership_name(&self, space: &str) -> String {
        format!("{space}/members/{}", self.current_user)
    }

    pub(crate) fn is_member(&self, space: &str) -> bool {
        self.db.memberships.contains(&self.membership_name(space))
    }

    pub(crate) fn display_name(&self, user: &str) -> Value {
        self.db
            .users
            .get(user)
            .and_then(|entry| entry.get("displayName").cloned())
            .unwrap_or(Value::Null)
    }
}

/// Chat answers a rejected request with an error object and anything else
/// that fails with an empty object.
pub fn respond(result: SimResult<Value>) -> Value {
    match result {
        Ok(value) => value,
        Err(SimError::Validation(message)) => {
            warn!(%message, "chat request rejected");
            json!({ "error": message })
        }
        Err(err) => {
            warn!(error = %err, "chat request yielded nothing");
            json!({})
        }
    }
}

/// Current time as RFC 3339 UTC with a `Z` suffix.
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Page size within `1..=max`; absent or zero means `default`.
pub(crate) fn page_size(requested: Option<usize>, default: usize, max: usize) -> usize {
    match requested {
        None | Some(0) => default,
        Some(size) => size.min(max),
    }
}

/// One page under `key`. Unparsable tokens restart from the beginning.
pub(crate) fn page_of(key: &str, items: Vec<Value>, token: Option<&str>, size: usize) -> Value {
    let page = paginate(items, parse_token(token).unwrap_or(0), size);
    let mut out = Entity::new();
    out.insert(key.to_string(), Value::Array(page.items));
    if let Some(next) = page.next_page_token {
        out.insert("nextPageToken".to_string(), json!(next));
    }
    Value::Object(out)
}

/// First unused name produced by `render` from the collection counter.
pub(crate) fn fresh_name(collection: &mut Collection, render: impl Fn(u64) -> String) -> String {
    loop {
        let candidate = render(collection.next_id());
        if !collection.contains(&candidate) {
            return candidate;
        }
    }
}

/// Splits an update mask. `*` expands to every field in `all`.
pub(crate) fn mask_fields(update_mask: &str, all: &[&str]) -> Vec<String> {
    if update_mask.trim() == "*" {
        return all.iter().map(ToString::to_string).collect();
    }
    update_mask
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Reads a body field given either its snake_case or camelCase spelling.
pub(crate) fn body_field<'a>(body: &'a Value, snake: &str, camel: &str) -> Option<&'a Value> {
    body.get(snake).or_else(|| body.get(camel))
}

pub(crate) fn has_prefix(entity: &Entity, prefix: &str) -> bool {
    entity
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| name.starts_with(prefix))
}
