use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::query::{Clause, FieldSpec, Matcher, OrMode, Schema, UnknownField, parse_colon};
use crate::store::{Entity, object, paginate, parse_token, str_field};

use super::mime::{self, MimeAttachment, MimeMessage};
use super::{GmailStore, ListParams, Mailbox, has_label, threads};

const SNIPPET_LIMIT: usize = 120;

pub(crate) const MESSAGE_SCHEMA: Schema = Schema::new(
    &[
        FieldSpec::new("from", "sender", Matcher::ExactIgnoreCase),
        FieldSpec::new("to", "recipient", Matcher::Custom(recipient_matches)),
        FieldSpec::new("subject", "subject", Matcher::Contains),
        FieldSpec::new("body", "body", Matcher::Contains),
        FieldSpec::new("label", "labelIds", Matcher::ListContains),
        FieldSpec::new("in", "labelIds", Matcher::ListContains),
        FieldSpec::new("attachment", "attachment", Matcher::Custom(attachment_matches)),
        FieldSpec::new("is", "isRead", Matcher::Custom(read_state_matches)),
    ],
    UnknownField::Keyword,
)
.with_keywords(&["subject", "body", "sender", "recipient"]);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MessageFormat {
    Minimal,
    Metadata,
    Full,
    Raw,
}

impl FromStr for MessageFormat {
    type Err = SimError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "metadata" => Ok(Self::Metadata),
            "" | "full" => Ok(Self::Full),
            "raw" => Ok(Self::Raw),
            other => Err(SimError::invalid(format!("unsupported message format: {other}"))),
        }
    }
}

pub fn insert(store: &mut GmailStore, user_id: &str, msg: Value, deleted: bool) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let id = format!("message-{}", mailbox.messages.next_id());
    let labels = vec![json!("INBOX"), json!("UNREAD")];
    let mut message = compose(mailbox, id, &object(msg), "234567890", labels);
    mark_deleted(&mut message, deleted);
    Ok(store_message(mailbox, message))
}

pub fn import(store: &mut GmailStore, user_id: &str, msg: Value, deleted: bool) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let id = format!("msg_{}", mailbox.messages.next_id());
    let mut message = compose(mailbox, id, &object(msg), "123456789", Vec::new());
    mark_deleted(&mut message, deleted);
    Ok(store_message(mailbox, message))
}

/// Sends `msg` from the mailbox owner. Sent mail carries only the `SENT` label.
pub fn send(store: &mut GmailStore, user_id: &str, msg: Value) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let id = format!("msg_{}", mailbox.messages.next_id());
    let mut input = object(msg);
    input.remove("labelIds");
    if str_field(&input, "sender").is_empty() && str_field(&input, "raw").is_empty() {
        input.insert("sender".to_string(), json!(mailbox.email()));
    }

    let mut message = compose(mailbox, id, &input, "345678901", vec![json!("SENT")]);
    message.insert("labelIds".to_string(), json!(["SENT"]));
    Ok(store_message(mailbox, message))
}

pub fn get(store: &GmailStore, user_id: &str, id: &str, format: Option<&str>) -> SimResult<Value> {
    let format = format.unwrap_or("full").parse::<MessageFormat>()?;
    let mailbox = store.mailbox(user_id)?;
    let message = mailbox
        .messages
        .get(id)
        .ok_or_else(|| SimError::not_found(format!("message {id}")))?;
    Ok(render(message, format))
}

pub fn list(store: &GmailStore, user_id: &str, params: &ListParams) -> SimResult<Value> {
    let mailbox = store.mailbox(user_id)?;
    let query = parse_colon(&params.q, OrMode::Alternation);

    let matched = mailbox
        .messages
        .iter()
        .map(|message| Value::Object(message.clone()))
        .filter(|message| query.matches(message, &MESSAGE_SCHEMA))
        .filter(|message| carries_labels(message, &params.label_ids))
        .collect::<Vec<_>>();

    let estimate = matched.len();
    let page = paginate(matched, parse_token(params.page_token.as_deref())?, params.max_results);
    Ok(json!({
        "messages": page.items,
        "nextPageToken": page.next_page_token,
        "resultSizeEstimate": estimate,
    }))
}

pub fn modify(
    store: &mut GmailStore,
    user_id: &str,
    id: &str,
    add: &[String],
    remove: &[String],
) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let updated = relabel(mailbox, id, add, remove)?;
    mailbox.record_history("labelsModified", &[id.to_string()]);
    Ok(updated)
}

pub fn batch_modify(
    store: &mut GmailStore,
    user_id: &str,
    ids: &[String],
    add: &[String],
    remove: &[String],
) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let mut touched = Vec::new();
    for id in ids {
        match relabel(mailbox, id, add, remove) {
            Ok(_) => touched.push(id.clone()),
            Err(SimError::NotFound(_)) => debug!(%id, "batch modify skipped missing message"),
            Err(err) => return Err(err),
        }
    }
    if !touched.is_empty() {
        mailbox.record_history("labelsModified", &touched);
    }
    Ok(json!({}))
}

pub fn trash(store: &mut GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    modify(store, user_id, id, &["TRASH".to_string()], &[])
}

pub fn untrash(store: &mut GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    modify(store, user_id, id, &[], &["TRASH".to_string()])
}

pub fn delete(store: &mut GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let removed = remove_message(mailbox, id)?;
    mailbox.record_history("messagesDeleted", &[id.to_string()]);
    Ok(Value::Object(removed))
}

pub fn batch_delete(store: &mut GmailStore, user_id: &str, ids: &[String]) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let removed = ids
        .iter()
        .filter(|id| remove_message(mailbox, id.as_str()).is_ok())
        .cloned()
        .collect::<Vec<_>>();
    if !removed.is_empty() {
        mailbox.record_history("messagesDeleted", &removed);
    }
    Ok(json!({}))
}

pub fn get_attachment(
    store: &GmailStore,
    user_id: &str,
    message_id: &str,
    attachment_id: &str,
) -> SimResult<Value> {
    let mailbox = store.mailbox(user_id)?;
    let message = mailbox
        .messages
        .get(message_id)
        .ok_or_else(|| SimError::not_found(format!("message {message_id}")))?;

    message
        .get("attachment")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|part| part.get("attachmentId").and_then(Value::as_str) == Some(attachment_id))
        .map(|part| {
            json!({
                "attachmentId": attachment_id,
                "size": part.get("size").cloned().unwrap_or(json!(0)),
                "data": part.get("data").cloned().unwrap_or(json!("")),
            })
        })
        .ok_or_else(|| SimError::not_found(format!("attachment {attachment_id}")))
}

/// Builds a stored message from request fields, falling back to the raw payload.
pub(crate) fn compose(
    mailbox: &mut Mailbox,
    id: String,
    input: &Entity,
    internal_date: &str,
    default_labels: Vec<Value>,
) -> Entity {
    let raw = str_field(input, "raw").to_string();
    let parsed = mime::parse_raw_message(&raw).unwrap_or_default();
    let pick = |field: &str, fallback: &str| -> String {
        let given = str_field(input, field);
        if given.is_empty() {
            fallback.to_string()
        } else {
            given.to_string()
        }
    };

    let thread_id = match str_field(input, "threadId") {
        "" => fresh_thread_id(mailbox),
        given => given.to_string(),
    };
    let body = pick("body", &parsed.body);
    let attachment = match input.get("attachment") {
        Some(Value::Array(parts)) => Value::Array(parts.clone()),
        _ => attachment_parts(&parsed.attachments),
    };

    let mut message = Entity::new();
    message.insert("id".to_string(), json!(id));
    message.insert("threadId".to_string(), json!(thread_id));
    message.insert("raw".to_string(), json!(raw));
    message.insert("sender".to_string(), json!(pick("sender", &parsed.from)));
    message.insert("recipient".to_string(), json!(pick("recipient", &parsed.to)));
    message.insert("subject".to_string(), json!(pick("subject", &parsed.subject)));
    message.insert("snippet".to_string(), json!(snippet(&body)));
    message.insert("body".to_string(), json!(body));
    message.insert("date".to_string(), json!(pick("date", &parsed.date)));
    message.insert(
        "internalDate".to_string(),
        input.get("internalDate").cloned().unwrap_or(json!(internal_date)),
    );
    message.insert(
        "isRead".to_string(),
        input.get("isRead").cloned().unwrap_or(json!(false)),
    );
    message.insert("attachment".to_string(), attachment);
    message.insert(
        "labelIds".to_string(),
        match input.get("labelIds") {
            Some(Value::Array(labels)) => Value::Array(labels.clone()),
            _ => Value::Array(default_labels),
        },
    );
    message
}

pub(crate) fn store_message(mailbox: &mut Mailbox, message: Entity) -> Value {
    let id = str_field(&message, "id").to_string();
    let thread_id = str_field(&message, "threadId").to_string();
    let stored = Value::Object(mailbox.messages.insert(message).clone());
    threads::link(mailbox, &thread_id, &id);
    mailbox.record_history("messagesAdded", &[id.clone()]);
    debug!(%id, %thread_id, "message stored");
    stored
}

pub(crate) fn relabel(
    mailbox: &mut Mailbox,
    id: &str,
    add: &[String],
    remove: &[String],
) -> SimResult<Value> {
    let message = mailbox
        .messages
        .get_mut(id)
        .ok_or_else(|| SimError::not_found(format!("message {id}")))?;

    let mut labels = match message.remove("labelIds") {
        Some(Value::Array(labels)) => labels,
        _ => Vec::new(),
    };
    for label in add {
        if !labels.iter().any(|existing| existing.as_str() == Some(label)) {
            labels.push(json!(label));
        }
    }
    labels.retain(|existing| {
        !remove
            .iter()
            .any(|label| existing.as_str() == Some(label.as_str()))
    });
    message.insert("labelIds".to_string(), Value::Array(labels));
    Ok(Value::Object(message.clone()))
}

pub(crate) fn remove_message(mailbox: &mut Mailbox, id: &str) -> SimResult<Entity> {
    let removed = mailbox
        .messages
        .delete(id)
        .ok_or_else(|| SimError::not_found(format!("message {id}")))?;
    threads::unlink(mailbox, str_field(&removed, "threadId"), id);
    Ok(removed)
}

pub(crate) fn render(message: &Entity, format: MessageFormat) -> Value {
    let mut out = Entity::new();
    for field in ["id", "threadId", "labelIds"] {
        if let Some(value) = message.get(field) {
            out.insert(field.to_string(), value.clone());
        }
    }

    match format {
        MessageFormat::Minimal => {}
        MessageFormat::Metadata => {
            out.insert("snippet".to_string(), json!(str_field(message, "snippet")));
            let internal_date = message.get("internalDate").cloned().unwrap_or(Value::Null);
            out.insert("internalDate".to_string(), internal_date);
            out.insert("payload".to_string(), json!({ "headers": headers(message) }));
        }
        MessageFormat::Full => {
            let mut full = message.clone();
            full.insert("payload".to_string(), json!({ "headers": headers(message) }));
            return Value::Object(full);
        }
        MessageFormat::Raw => {
            let raw = match str_field(message, "raw") {
                "" => mime::build_raw_message(&as_mime(message)),
                stored => stored.to_string(),
            };
            out.insert("raw".to_string(), json!(raw));
        }
    }

    Value::Object(out)
}

/// Compact, entity-decoded preview of a message body.
pub(crate) fn snippet(body: &str) -> String {
    let decoded = html_escape::decode_html_entities(body).to_string();
    let compact = decoded.split_whitespace().collect::<Vec<_>>().join(" ");

    if compact.len() <= SNIPPET_LIMIT {
        return compact;
    }

    let mut end = SNIPPET_LIMIT;
    while !compact.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &compact[..end])
}

fn headers(message: &Entity) -> Value {
    let pairs = [
        ("From", "sender"),
        ("To", "recipient"),
        ("Subject", "subject"),
        ("Date", "date"),
    ];
    Value::Array(
        pairs
            .iter()
            .filter(|(_, field)| !str_field(message, field).is_empty())
            .map(|(name, field)| json!({ "name": name, "value": str_field(message, field) }))
            .collect(),
    )
}

fn as_mime(message: &Entity) -> MimeMessage {
    let attachments = message
        .get("attachment")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|part| {
            let filename = part.get("filename").and_then(Value::as_str)?.to_string();
            let data = part
                .get("data")
                .and_then(Value::as_str)
                .and_then(|data| URL_SAFE_NO_PAD.decode(data).ok())
                .unwrap_or_default();
            let mime_type = part
                .get("mimeType")
                .and_then(Value::as_str)
                .map(ToString::to_string)
                .unwrap_or_else(|| mime::guess_mime_type(&filename));
            Some(MimeAttachment {
                filename,
                mime_type,
                data,
            })
        })
        .collect();

    MimeMessage {
        from: str_field(message, "sender").to_string(),
        to: str_field(message, "recipient").to_string(),
        subject: str_field(message, "subject").to_string(),
        date: str_field(message, "date").to_string(),
        body: str_field(message, "body").to_string(),
        attachments,
    }
}

fn attachment_parts(attachments: &[MimeAttachment]) -> Value {
    Value::Array(
        attachments
            .iter()
            .enumerate()
            .map(|(index, attachment)| {
                json!({
                    "attachmentId": format!("att-{}", index + 1),
                    "filename": attachment.filename,
                    "mimeType": attachment.mime_type,
                    "size": attachment.data.len(),
                    "data": URL_SAFE_NO_PAD.encode(&attachment.data),
                })
            })
            .collect(),
    )
}

fn fresh_thread_id(mailbox: &mut Mailbox) -> String {
    loop {
        let candidate = format!("thread-{}", mailbox.threads.next_id());
        if !mailbox.threads.contains(&candidate) {
            return candidate;
        }
    }
}

fn mark_deleted(message: &mut Entity, deleted: bool) {
    if !deleted {
        return;
    }
    if let Some(Value::Array(labels)) = message.get_mut("labelIds") {
        if !has_label(labels, "DELETED") {
            labels.push(json!("DELETED"));
        }
    }
}

fn carries_labels(message: &Value, wanted: &[String]) -> bool {
    let labels = message
        .get("labelIds")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    wanted.iter().all(|label| {
        labels
            .iter()
            .any(|existing| existing.as_str() == Some(label.as_str()))
    })
}

fn recipient_matches(message: &Value, clause: &Clause) -> bool {
    if clause.value.trim().is_empty() {
        return true;
    }
    message
        .get("recipient")
        .and_then(Value::as_str)
        .is_some_and(|recipient| recipient.eq_ignore_ascii_case(clause.value.trim()))
}

fn attachment_matches(message: &Value, clause: &Clause) -> bool {
    let parts = message
        .get("attachment")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let wanted = clause.value.trim().to_lowercase();
    if wanted == "any" {
        return !parts.is_empty();
    }
    parts.iter().any(|part| {
        part.get("filename")
            .and_then(Value::as_str)
            .is_some_and(|name| name.to_lowercase().contains(&wanted))
    })
}

fn read_state_matches(message: &Value, clause: &Clause) -> bool {
    let read = message
        .get("isRead")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    match clause.value.to_ascii_lowercase().as_str() {
        "read" => read,
        "unread" => !read,
        _ => false,
    }
}
