//! Slack Web API methods (`chat.*`, `conversations.*`, `files.*`, ...).
//!
//! Channels own their messages, so they are kept as typed values. Users,
//! files, reminders and usergroups are plain keyed collections. Every
//! operation returns the method's payload; [`respond`] adds the `ok` flag.

pub mod admin_users;
pub mod chat;
pub mod conversations;
pub mod files;
pub mod reactions;
pub mod reminders;
pub mod search;
pub mod usergroups;
pub mod users;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::Utc;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{SimError, SimResult};
use crate::store::{Collection, Entity, MissingFile, Page, VendorStore, paginate, parse_token};

const SUFFIX_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static LINK: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"https?://[^\s>|]+").ok());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackDb {
    #[serde(default)]
    pub users: Collection,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub files: Collection,
    #[serde(default)]
    pub reminders: Collection,
    #[serde(default)]
    pub usergroups: Collection,
    #[serde(default = "scheduled")]
    pub scheduled_messages: Collection,
    #[serde(default)]
    pub ephemeral_messages: Vec<Entity>,
}

fn scheduled() -> Collection {
    Collection::keyed("message_id")
}

impl Default for SlackDb {
    fn default() -> Self {
        Self {
            users: Collection::default(),
            channels: Vec::new(),
            files: Collection::default(),
            reminders: Collection::default(),
            usergroups: Collection::default(),
            scheduled_messages: scheduled(),
            ephemeral_messages: Vec::new(),
        }
    }
}

impl SlackDb {
    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.id == id)
    }

    pub fn channel_mut(&mut self, id: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|channel| channel.id == id)
    }

    pub(crate) fn has_channel(&self, id: &str) -> bool {
        self.channel(id).is_some()
    }

    pub(crate) fn name_taken(&self, name: &str) -> bool {
        self.channels.iter().any(|channel| channel.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default = "open")]
    pub is_open: bool,
    #[serde(default)]
    pub conversations: Conversation,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Ids of the files shared into the channel.
    #[serde(default)]
    pub files: BTreeMap<String, bool>,
}

fn open() -> bool {
    true
}

impl Channel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: None,
            is_private: false,
            team_id: None,
            is_archived: false,
            is_open: true,
            conversations: Conversation::default(),
            messages: Vec::new(),
            files: BTreeMap::new(),
        }
    }

    /// Conversation type used by `types` filters.
    pub fn kind(&self) -> &str {
        match self.kind.as_deref() {
            Some(kind) => kind,
            None if self.is_private => "private_channel",
            None => "public_channel",
        }
    }

    pub fn message(&self, ts: &str) -> Option<&Message> {
        self.messages.iter().find(|message| message.ts == ts)
    }

    pub fn message_mut(&mut self, ts: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|message| message.ts == ts)
    }

    pub fn is_member(&self, user: &str) -> bool {
        self.conversations.members.iter().any(|member| member == user)
    }

    /// A `ts` later than every message already in the channel.
    pub(crate) fn next_ts(&self) -> String {
        let last = self
            .messages
            .iter()
            .filter_map(|message| ts_micros(&message.ts))
            .max()
            .unwrap_or(0);
        let micros = Utc::now().timestamp_micros().max(last + 1);
        format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub members: Vec<String>,
    /// Participants of a direct conversation opened by `conversations.open`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_starred: bool,
    /// Remaining message arguments (`blocks`, `attachments`, `thread_ts`, ...).
    #[serde(flatten)]
    pub extra: Entity,
}

fn is_false(flag: &bool) -> bool {
    !flag
}

impl Message {
    pub fn new(ts: String, user: &str, text: &str) -> Self {
        let mut message = Self {
            ts,
            user: user.to_string(),
            ..Self::default()
        };
        message.set_text(text);
        message
    }

    /// Replaces the text and recomputes the links it carries.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.links = match LINK.as_ref() {
            Some(link) => link
                .find_iter(text)
                .map(|found| found.as_str().to_string())
                .collect(),
            None => Vec::new(),
        };
    }

    /// Copies every non-null field of `fields` onto the message.
    pub(crate) fn absorb(&mut self, fields: &Value) {
        let Some(fields) = fields.as_object() else {
            return;
        };
        for (key, value) in fields.iter().filter(|(_, value)| !value.is_null()) {
            match key.as_str() {
                "text" => self.set_text(value.as_str().unwrap_or("")),
                "is_starred" => self.is_starred = value.as_bool().unwrap_or(false),
                "ts" | "user" | "reactions" | "replies" | "links" => {}
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SlackStore {
    db: SlackDb,
}

impl VendorStore for SlackStore {
    type Db = SlackDb;

    const VENDOR: &'static str = "slack";
    const MISSING_FILE: MissingFile = MissingFile::Ignore;

    fn from_db(db: SlackDb) -> Self {
        Self { db }
    }

    fn db(&self) -> &SlackDb {
        &self.db
    }

    fn db_mut(&mut self) -> &mut SlackDb {
        &mut self.db
    }
}

impl SlackStore {
    pub(crate) fn channel(&self, id: &str) -> SimResult<&Channel> {
        self.db
            .channel(id)
            .ok_or_else(|| SimError::not_found("channel_not_found"))
    }

    pub(crate) fn channel_mut(&mut self, id: &str) -> SimResult<&mut Channel> {
        self.db
            .channel_mut(id)
            .ok_or_else(|| SimError::not_found("channel_not_found"))
    }

    pub(crate) fn user_exists(&self, id: &str) -> bool {
        self.db.users.contains(id)
    }
}

/// Slack wraps every payload in `{"ok": true, ..}` and every failure in
/// `{"ok": false, "error": code}`.
pub fn respond(result: SimResult<Value>) -> Value {
    match result {
        Ok(Value::Object(mut fields)) => {
            fields.insert("ok".to_string(), Value::Bool(true));
            Value::Object(fields)
        }
        Ok(Value::Null) => json!({ "ok": true }),
        Ok(other) => json!({ "ok": true, "result": other }),
        Err(err) => {
            warn!(error = err.message(), "slack call failed");
            json!({ "ok": false, "error": err.message() })
        }
    }
}

/// Fails with `code` when `value` is absent or blank.
pub(crate) fn require<'a>(value: Option<&'a str>, code: &str) -> SimResult<&'a str> {
    match value.map(str::trim) {
        Some(found) if !found.is_empty() => Ok(found),
        _ => Err(SimError::invalid(code)),
    }
}

/// `prefix` plus the first 8 upper-case hex digits of the SHA-256 of `seed`.
/// A taken id gets a random 2-character suffix.
pub(crate) fn hashed_id(prefix: char, seed: &str, taken: impl Fn(&str) -> bool) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let base = digest
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02X}"))
        .collect::<String>();
    let id = format!("{prefix}{base}");
    if !taken(&id) {
        return id;
    }

    let mut rng = rand::thread_rng();
    loop {
        let candidate = format!("{id}{}", random_chars(&mut rng, 2));
        if !taken(&candidate) {
            return candidate;
        }
    }
}

pub(crate) fn random_chars(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())] as char)
        .collect()
}

/// Current epoch seconds with microsecond precision.
pub(crate) fn now_ts() -> String {
    let micros = Utc::now().timestamp_micros();
    format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000)
}

/// A `ts` string in whole microseconds.
pub(crate) fn ts_micros(ts: &str) -> Option<i64> {
    let (whole, fraction) = ts.trim().split_once('.').unwrap_or((ts.trim(), ""));
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let seconds = whole.parse::<i64>().ok()?;
    let digits: String = fraction.chars().chain(std::iter::repeat('0')).take(6).collect();
    let micros = digits.parse::<i64>().ok()?;
    let micros = if whole.starts_with('-') { -micros } else { micros };
    seconds.checked_mul(1_000_000)?.checked_add(micros)
}

/// Index cursor used by the list methods.
pub(crate) fn cursor_page<T>(items: Vec<T>, cursor: Option<&str>, limit: usize) -> SimResult<Page<T>> {
    let offset = parse_token(cursor).map_err(|_| SimError::invalid("invalid_cursor"))?;
    Ok(paginate(items, offset, limit))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Comma separated argument, blanks dropped.
pub(crate) fn split_list(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_ids_are_stable_and_avoid_collisions() {
        let first = hashed_id('C', "general", |_| false);
        assert_eq!(first.len(), 9);
        assert!(first.starts_with('C'));
        assert_eq!(first, hashed_id('C', "general", |_| false));

        let second = hashed_id('C', "general", |id| id == first);
        assert_eq!(second.len(), 11);
        assert!(second.starts_with(&first));
    }

    #[test]
    fn next_ts_moves_past_existing_messages() {
        let mut channel = Channel::new("C1", "general");
        channel.messages.push(Message::new("9999999999.000001".to_string(), "U1", "later"));
        assert_eq!(channel.next_ts(), "9999999999.000002");
    }

    #[test]
    fn ts_keeps_every_microsecond() {
        assert_eq!(ts_micros("9999999999.000001"), Some(9_999_999_999_000_001));
        assert_eq!(ts_micros("1700000000.5"), Some(1_700_000_000_500_000));
        assert_eq!(ts_micros("1700000000.12345678"), Some(1_700_000_000_123_456));
        assert_eq!(ts_micros("42"), Some(42_000_000));
        assert_eq!(ts_micros("1.2e3"), None);
        assert_eq!(ts_micros("soon"), None);
    }

    #[test]
    fn links_follow_text() {
        let mut message = Message::new(now_ts(), "U1", "see https://example.com/a now");
        assert_eq!(message.links, vec!["https://example.com/a"]);
        message.set_text("no link");
        assert!(message.links.is_empty());
    }

    #[test]
    fn failures_carry_the_code() {
        assert_eq!(
            respond(Err(SimError::not_found("channel_not_found"))),
            json!({ "ok": false, "error": "channel_not_found" })
        );
        assert_eq!(respond(Ok(json!({}))), json!({ "ok": true }));
    }

    #[test]
    fn extra_fields_round_trip_through_json() {
        let mut message = Message::new("1.000000".to_string(), "U1", "hi");
        message.absorb(&json!({ "blocks": [1], "thread_ts": null, "text": "hey" }));
        let value = to_json(&message);
        assert_eq!(value["blocks"], json!([1]));
        assert!(value.get("thread_ts").is_none());
        assert_eq!(value["text"], "hey");
        let back: Message = serde_json::from_value(value).expect("message");
        assert_eq!(back, message);
    }
}
