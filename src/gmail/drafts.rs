use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::query::{FieldSpec, Matcher, OrMode, Schema, UnknownField, parse_colon};
use crate::store::{Entity, object, paginate, parse_token};

use super::{GmailStore, ListParams, has_label, messages};

const DRAFT_SCHEMA: Schema = Schema::new(
    &[
        FieldSpec::new("from", "message.sender", Matcher::ExactIgnoreCase),
        FieldSpec::new("to", "message.recipient", Matcher::ExactIgnoreCase),
        FieldSpec::new("subject", "message.subject", Matcher::Contains),
        FieldSpec::new("body", "message.body", Matcher::Contains),
        FieldSpec::new("label", "message.labelIds", Matcher::ListContains),
    ],
    UnknownField::Keyword,
)
.with_keywords(&[
    "message.subject",
    "message.body",
    "message.sender",
    "message.recipient",
]);

const MESSAGE_DEFAULTS: [(&str, &str); 6] = [
    ("raw", ""),
    ("sender", ""),
    ("recipient", ""),
    ("subject", ""),
    ("body", ""),
    ("date", ""),
];

pub fn create(store: &mut GmailStore, user_id: &str, draft: Value) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let number = mailbox.drafts.next_id();
    let id = format!("draft-{number}");
    let input = object(draft.get("message").cloned().unwrap_or(Value::Null));

    let mut message = Entity::new();
    message.insert("id".to_string(), json!(id));
    message.insert(
        "threadId".to_string(),
        input
            .get("threadId")
            .cloned()
            .unwrap_or_else(|| json!(format!("thread-{number}"))),
    );
    for (field, default) in MESSAGE_DEFAULTS {
        message.insert(
            field.to_string(),
            input.get(field).cloned().unwrap_or_else(|| json!(default)),
        );
    }
    message.insert(
        "internalDate".to_string(),
        input.get("internalDate").cloned().unwrap_or(json!("234567890")),
    );
    message.insert(
        "isRead".to_string(),
        input.get("isRead").cloned().unwrap_or(json!(false)),
    );
    message.insert(
        "labelIds".to_string(),
        input.get("labelIds").cloned().unwrap_or(json!(["DRAFT"])),
    );
    ensure_draft_label(&mut message);

    let mut record = Entity::new();
    record.insert("id".to_string(), json!(id));
    record.insert("message".to_string(), Value::Object(message));
    debug!(%id, "draft created");
    Ok(Value::Object(mailbox.drafts.insert(record).clone()))
}

pub fn list(store: &GmailStore, user_id: &str, params: &ListParams) -> SimResult<Value> {
    let mailbox = store.mailbox(user_id)?;
    let query = parse_colon(&params.q, OrMode::Alternation);

    let matched = mailbox
        .drafts
        .iter()
        .map(|draft| Value::Object(draft.clone()))
        .filter(|draft| query.matches(draft, &DRAFT_SCHEMA))
        .collect::<Vec<_>>();

    let page = paginate(matched, parse_token(params.page_token.as_deref())?, params.max_results);
    Ok(json!({
        "drafts": page.items,
        "nextPageToken": page.next_page_token,
    }))
}

pub fn get(store: &GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    let mailbox = store.mailbox(user_id)?;
    mailbox
        .drafts
        .get(id)
        .map(|draft| Value::Object(draft.clone()))
        .ok_or_else(|| SimError::not_found(format!("draft {id}")))
}

/// Merges the new message fields into the draft. The `DRAFT` label survives any update.
pub fn update(store: &mut GmailStore, user_id: &str, id: &str, draft: Value) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let existing = mailbox
        .drafts
        .get_mut(id)
        .ok_or_else(|| SimError::not_found(format!("draft {id}")))?;

    let patch = object(draft.get("message").cloned().unwrap_or(Value::Null));
    let message = existing
        .entry("message".to_string())
        .or_insert_with(|| json!({}));
    if let Value::Object(message) = message {
        for (field, value) in patch {
            if field != "id" {
                message.insert(field, value);
            }
        }
        ensure_draft_label(message);
    }

    debug!(%id, "draft updated");
    Ok(Value::Object(existing.clone()))
}

pub fn delete(store: &mut GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    mailbox
        .drafts
        .delete(id)
        .map(Value::Object)
        .ok_or_else(|| SimError::not_found(format!("draft {id}")))
}

/// Sends a stored draft and removes it, or sends the supplied message when the
/// draft id is unknown.
pub fn send(store: &mut GmailStore, user_id: &str, draft: Value) -> SimResult<Value> {
    let id = draft.get("id").and_then(Value::as_str).unwrap_or("");
    let stored = store.mailbox_mut(user_id)?.drafts.delete(id);

    let message = match stored {
        Some(record) => {
            debug!(%id, "sending stored draft");
            record.get("message").cloned().unwrap_or(Value::Null)
        }
        None => draft.get("message").cloned().unwrap_or(Value::Null),
    };

    let mut outgoing = object(message);
    outgoing.remove("id");
    outgoing.remove("labelIds");
    messages::send(store, user_id, Value::Object(outgoing))
}

fn ensure_draft_label(message: &mut Entity) {
    match message.get_mut("labelIds") {
        Some(Value::Array(labels)) => {
            if !has_label(labels, "DRAFT") {
                labels.push(json!("DRAFT"));
            }
        }
        _ => {
            message.insert("labelIds".to_string(), json!(["DRAFT"]));
        }
    }
}
