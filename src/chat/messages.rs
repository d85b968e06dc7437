use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::query::{Connectives, FieldSpec, Matcher, Schema, UnknownField, parse_comparison};
use crate::store::{object, str_field};

use super::{ChatStore, body_field, fresh_name, has_prefix, mask_fields, now, page_of, page_size};

const CLIENT_PREFIX: &str = "client-";

const FILTER_SCHEMA: Schema = Schema::new(
    &[
        FieldSpec::new("thread.name", "thread.name", Matcher::Exact),
        FieldSpec::new("create_time", "createTime", Matcher::Ordered),
    ],
    UnknownField::MatchAll,
);

/// Mask name and stored field of every updatable message field.
const UPDATABLE: [(&str, &str); 5] = [
    ("text", "text"),
    ("attachment", "attachment"),
    ("cards", "cards"),
    ("cards_v2", "cardsV2"),
    ("accessory_widgets", "accessoryWidgets"),
];

#[derive(Debug, Clone, Default)]
pub struct CreateMessage<'a> {
    pub message_id: Option<&'a str>,
    pub request_id: Option<&'a str>,
    pub message_reply_option: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct ListMessages<'a> {
    pub page_size: Option<usize>,
    pub page_token: Option<&'a str>,
    pub filter: Option<&'a str>,
    pub order_by: Option<&'a str>,
    pub show_deleted: bool,
}

/// Posts `body` into the `parent` space as the current user.
pub fn create(
    store: &mut ChatStore,
    parent: &str,
    body: Value,
    options: &CreateMessage<'_>,
) -> SimResult<Value> {
    let body = object(body);
    if body.is_empty() {
        return Err(SimError::invalid("no message body is provided"));
    }
    if !store.is_member(parent) {
        return Err(SimError::not_found(format!(
            "membership of {} in {parent}",
            store.current_user()
        )));
    }

    let name = match options.message_id {
        Some(id) if !id.starts_with(CLIENT_PREFIX) => {
            return Err(SimError::invalid("messageId must start with 'client-'."));
        }
        Some(id) => format!("{parent}/messages/{id}"),
        None => fresh_name(&mut store.db.messages, |n| format!("{parent}/messages/{n}")),
    };
    if store.db.messages.contains(&name) {
        return Err(SimError::invalid(format!("message {name} already exists")));
    }

    let thread = body.get("thread").cloned().unwrap_or_else(|| json!({}));
    let thread_reply = thread
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|thread| !thread.is_empty());
    let mut message = object(json!({
        "name": name,
        "text": body.get("text").cloned().unwrap_or_else(|| json!("")),
        "attachment": body.get("attachment").cloned().unwrap_or_else(|| json!([])),
        "createTime": now(),
        "threadReply": thread_reply,
        "thread": thread,
        "sender": { "name": store.current_user(), "type": "HUMAN" },
    }));
    if let Some(id) = options.message_id {
        message.insert("clientAssignedMessageId".to_string(), json!(id));
    }

    debug!(
        %name,
        request_id = options.request_id.unwrap_or(""),
        reply_option = options.message_reply_option.unwrap_or(""),
        "message created"
    );
    Ok(Value::Object(store.db.messages.insert(message).clone()))
}

/// Messages of the space, oldest first unless `order_by` ends in `desc`.
/// Callers outside the space get an empty list.
pub fn list(store: &ChatStore, parent: &str, params: &ListMessages<'_>) -> SimResult<Value> {
    if !store.is_member(parent) {
        debug!(%parent, "caller is not a member, listing nothing");
        return Ok(json!({ "messages": [] }));
    }

    let query = match params.filter.map(str::trim) {
        None | Some("") => None,
        Some(filter) => Some(parse_comparison(filter, Connectives::AND_ONLY)?),
    };

    let prefix = format!("{parent}/messages/");
    let mut messages = store
        .db
        .messages
        .iter()
        .filter(|message| has_prefix(message, &prefix))
        .filter(|message| params.show_deleted || str_field(message, "deleteTime").is_empty())
        .map(|message| Value::Object(message.clone()))
        .filter(|message| {
            query
                .as_ref()
                .is_none_or(|query| query.matches(message, &FILTER_SCHEMA))
        })
        .collect::<Vec<_>>();

    let descending = params
        .order_by
        .and_then(|order| order.split_whitespace().nth(1))
        .is_some_and(|dir| dir.eq_ignore_ascii_case("desc"));
    if descending {
        messages.reverse();
    }

    let size = page_size(params.page_size, 25, 1000);
    Ok(page_of("messages", messages, params.page_token, size))
}

pub fn get(store: &ChatStore, name: &str) -> SimResult<Value> {
    let space = space_of(name)?;
    if !store.is_member(&space) {
        return Err(SimError::not_found(format!(
            "message {name} for {}",
            store.current_user()
        )));
    }
    store
        .db
        .messages
        .get(name)
        .map(|message| Value::Object(message.clone()))
        .ok_or_else(|| SimError::not_found(format!("message {name}")))
}

/// Updates the masked fields. With `allow_missing`, a missing message with a
/// `client-` id is created first.
pub fn update(
    store: &mut ChatStore,
    name: &str,
    update_mask: &str,
    allow_missing: bool,
    body: Value,
) -> SimResult<Value> {
    if !store.db.messages.contains(name) {
        if !allow_missing {
            return Err(SimError::not_found(format!("message {name}")));
        }
        let parts = name.split('/').collect::<Vec<_>>();
        if parts.len() < 4 || parts[2] != "messages" {
            return Err(SimError::invalid(format!("invalid message name: {name}")));
        }
        if !parts[3].starts_with(CLIENT_PREFIX) {
            return Err(SimError::not_found(format!("message {name}")));
        }
        store.db.messages.insert(object(json!({
            "name": name,
            "text": "",
            "attachment": [],
            "createTime": now(),
            "clientAssignedMessageId": parts[3],
        })));
        debug!(%name, "message created by update");
    }

    let message = store
        .db
        .messages
        .get_mut(name)
        .ok_or_else(|| SimError::not_found(format!("message {name}")))?;
    let all = UPDATABLE.map(|(mask, _)| mask);
    for mask in mask_fields(update_mask, &all) {
        let Some((snake, camel)) = UPDATABLE.iter().find(|(field, _)| *field == mask) else {
            debug!(%mask, "message update mask skipped");
            continue;
        };
        if let Some(value) = body_field(&body, snake, camel) {
            message.insert(camel.to_string(), value.clone());
        }
    }
    message.insert("lastUpdateTime".to_string(), json!(now()));

    Ok(Value::Object(message.clone()))
}

pub fn patch(_store: &mut ChatStore, name: &str, _update_mask: &str, _body: Value) -> SimResult<Value> {
    Err(SimError::unsupported(format!("spaces.messages.patch on {name}")))
}

/// Deletes a message. Other messages in its thread block the delete unless
/// `force` is set, in which case they go too.
pub fn delete(store: &mut ChatStore, name: &str, force: bool) -> SimResult<Value> {
    let target = store
        .db
        .messages
        .get(name)
        .ok_or_else(|| SimError::not_found(format!("message {name}")))?;
    let thread = target
        .get("thread")
        .and_then(|thread| thread.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let replies = store
        .db
        .messages
        .iter()
        .filter(|message| !thread.is_empty() && str_field(message, "name") != name)
        .filter(|message| {
            message
                .get("thread")
                .and_then(|t| t.get("name"))
                .and_then(Value::as_str)
                == Some(thread.as_str())
        })
        .map(|message| str_field(message, "name").to_string())
        .collect::<Vec<_>>();

    if !replies.is_empty() && !force {
        return Err(SimError::invalid(format!(
            "message {name} has replies; set force to delete them"
        )));
    }

    for reply in replies.iter().map(String::as_str).chain([name]) {
        store.db.messages.delete(reply);
        let prefix = format!("{reply}/");
        store.db.reactions.retain(|reaction| !has_prefix(reaction, &prefix));
    }
    debug!(%name, replies = replies.len(), "message deleted");
    Ok(json!({}))
}

/// `spaces/{space}` part of a message or attachment name.
pub(crate) fn space_of(name: &str) -> SimResult<String> {
    let parts = name.split('/').collect::<Vec<_>>();
    if parts.len() < 4 || parts[0] != "spaces" || parts[2] != "messages" {
        return Err(SimError::invalid(format!("invalid message name: {name}")));
    }
    Ok(parts[..2].join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_is_taken_from_message_name() {
        assert_eq!(space_of("spaces/AAA/messages/1"), Ok("spaces/AAA".to_string()));
        assert!(space_of("spaces/AAA").is_err());
        assert!(space_of("rooms/AAA/messages/1").is_err());
    }
}
