//! Gmail `users.*` resources backed by per-user mailboxes.

pub mod drafts;
pub mod history;
pub mod labels;
pub mod messages;
pub mod mime;
pub mod send_as;
pub mod settings;
pub mod threads;
pub mod users;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Collection, Entity, MissingFile, VendorStore, object};

pub const DEFAULT_USER: &str = "me";
pub const DEFAULT_EMAIL: &str = "me@example.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GmailDb {
    #[serde(default)]
    pub users: BTreeMap<String, Mailbox>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mailbox {
    pub profile: Entity,
    #[serde(default)]
    pub drafts: Collection,
    #[serde(default)]
    pub messages: Collection,
    #[serde(default)]
    pub threads: Collection,
    #[serde(default)]
    pub labels: Collection,
    #[serde(default)]
    pub settings: MailSettings,
    #[serde(default)]
    pub history: Vec<Value>,
    #[serde(default)]
    pub watch: Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailSettings {
    pub imap: Entity,
    pub pop: Entity,
    pub vacation: Entity,
    pub language: Entity,
    pub auto_forwarding: Entity,
    pub send_as: Collection,
    /// S/MIME configs per send-as address.
    #[serde(default)]
    pub smime_info: BTreeMap<String, Collection>,
    #[serde(default)]
    pub smime_counter: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            imap: Entity::new(),
            pop: Entity::new(),
            vacation: object(json!({ "enableAutoReply": false })),
            language: object(json!({ "displayLanguage": "en" })),
            auto_forwarding: object(json!({ "enabled": false })),
            send_as: Collection::keyed("sendAsEmail"),
            smime_info: BTreeMap::new(),
            smime_counter: 0,
        }
    }
}

impl Mailbox {
    pub fn new(email: &str) -> Self {
        Self {
            profile: object(json!({
                "emailAddress": email,
                "messagesTotal": 0,
                "threadsTotal": 0,
                "historyId": "1",
            })),
            drafts: Collection::default(),
            messages: Collection::default(),
            threads: Collection::default(),
            labels: Collection::default(),
            settings: MailSettings::default(),
            history: Vec::new(),
            watch: Entity::new(),
        }
    }

    pub fn email(&self) -> &str {
        self.profile
            .get("emailAddress")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn history_id(&self) -> String {
        self.profile
            .get("historyId")
            .and_then(Value::as_str)
            .unwrap_or("1")
            .to_string()
    }

    /// Appends a history record for the touched messages and refreshes profile totals.
    pub(crate) fn record_history(&mut self, kind: &str, message_ids: &[String]) {
        let next = self.history_id().parse::<u64>().unwrap_or(1) + 1;
        let messages = message_ids
            .iter()
            .map(|id| {
                let thread_id = self
                    .messages
                    .get(id)
                    .and_then(|message| message.get("threadId").cloned())
                    .unwrap_or(Value::Null);
                json!({ "id": id, "threadId": thread_id })
            })
            .collect::<Vec<_>>();

        self.history.push(json!({
            "id": next.to_string(),
            "kind": kind,
            "messages": messages,
        }));
        self.profile
            .insert("historyId".to_string(), json!(next.to_string()));
        self.profile
            .insert("messagesTotal".to_string(), json!(self.messages.len()));
        self.profile
            .insert("threadsTotal".to_string(), json!(self.threads.len()));
    }
}

const DEFAULT_MAX_RESULTS: usize = 100;

/// Paging and filter arguments shared by the list endpoints.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub q: String,
    pub label_ids: Vec<String>,
    pub max_results: usize,
    pub page_token: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            q: String::new(),
            label_ids: Vec::new(),
            max_results: DEFAULT_MAX_RESULTS,
            page_token: None,
        }
    }
}

impl ListParams {
    pub fn query(q: &str) -> Self {
        Self {
            q: q.to_string(),
            ..Self::default()
        }
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }

    pub fn label_ids(mut self, labels: &[&str]) -> Self {
        self.label_ids = labels.iter().map(|label| label.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct GmailStore {
    db: GmailDb,
}

impl VendorStore for GmailStore {
    type Db = GmailDb;

    const VENDOR: &'static str = "gmail";
    const MISSING_FILE: MissingFile = MissingFile::Error;

    fn from_db(db: GmailDb) -> Self {
        Self { db }
    }

    fn db(&self) -> &GmailDb {
        &self.db
    }

    fn db_mut(&mut self) -> &mut GmailDb {
        &mut self.db
    }

    fn seeded() -> GmailDb {
        let mut users = BTreeMap::new();
        users.insert(DEFAULT_USER.to_string(), Mailbox::new(DEFAULT_EMAIL));
        GmailDb { users }
    }
}

impl GmailStore {
    pub(crate) fn mailbox(&self, user_id: &str) -> SimResult<&Mailbox> {
        self.db
            .users
            .get(user_id)
            .ok_or_else(|| unknown_user(user_id))
    }

    pub(crate) fn mailbox_mut(&mut self, user_id: &str) -> SimResult<&mut Mailbox> {
        self.db
            .users
            .get_mut(user_id)
            .ok_or_else(|| unknown_user(user_id))
    }
}

fn unknown_user(user_id: &str) -> SimError {
    SimError::invalid(format!("User '{user_id}' does not exist."))
}

/// Gmail surfaces a missing resource as an absent value, not an error.
pub fn respond(result: SimResult<Value>) -> SimResult<Option<Value>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SimError::NotFound(what)) => {
            debug!(%what, "gmail resource not found");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

pub(crate) fn has_label(labels: &[Value], wanted: &str) -> bool {
    labels
        .iter()
        .filter_map(Value::as_str)
        .any(|label| label.eq_ignore_ascii_case(wanted))
}
