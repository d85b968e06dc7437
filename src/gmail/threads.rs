use serde_json::{Value, json};

use crate::error::{SimError, SimResult};
use crate::query::{OrMode, parse_colon};
use crate::store::{Entity, paginate, parse_token};

use super::messages::{self, MESSAGE_SCHEMA};
use super::{GmailStore, ListParams, Mailbox};

pub fn list(store: &GmailStore, user_id: &str, params: &ListParams) -> SimResult<Value> {
    let mailbox = store.mailbox(user_id)?;
    let query = parse_colon(&params.q, OrMode::Alternation);

    let matched = mailbox
        .threads
        .iter()
        .filter(|thread| {
            params.q.trim().is_empty()
                || thread_messages(mailbox, thread)
                    .iter()
                    .any(|message| query.matches(message, &MESSAGE_SCHEMA))
        })
        .filter(|thread| {
            params.label_ids.iter().all(|label| {
                thread_messages(mailbox, thread).iter().any(|message| {
                    message
                        .get("labelIds")
                        .and_then(Value::as_array)
                        .is_some_and(|labels| labels.iter().any(|l| l.as_str() == Some(label)))
                })
            })
        })
        .map(|thread| json!({ "id": thread.get("id").cloned().unwrap_or(Value::Null) }))
        .collect::<Vec<_>>();

    let estimate = matched.len();
    let page = paginate(matched, parse_token(params.page_token.as_deref())?, params.max_results);
    Ok(json!({
        "threads": page.items,
        "nextPageToken": page.next_page_token,
        "resultSizeEstimate": estimate,
    }))
}

pub fn get(store: &GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    let mailbox = store.mailbox(user_id)?;
    let thread = find(mailbox, id)?;
    let mut out = thread.clone();
    out.insert(
        "messages".to_string(),
        Value::Array(thread_messages(mailbox, thread)),
    );
    Ok(Value::Object(out))
}

/// Deletes the thread together with every message it holds.
pub fn delete(store: &mut GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let thread = mailbox
        .threads
        .delete(id)
        .ok_or_else(|| SimError::not_found(format!("thread {id}")))?;

    let message_ids = message_ids(&thread);
    for message_id in &message_ids {
        mailbox.messages.delete(message_id);
    }
    mailbox.record_history("messagesDeleted", &message_ids);
    Ok(Value::Object(thread))
}

pub fn trash(store: &mut GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    modify(store, user_id, id, &["TRASH".to_string()], &[])
}

pub fn untrash(store: &mut GmailStore, user_id: &str, id: &str) -> SimResult<Value> {
    modify(store, user_id, id, &[], &["TRASH".to_string()])
}

/// Applies the label change to every message of the thread.
pub fn modify(
    store: &mut GmailStore,
    user_id: &str,
    id: &str,
    add: &[String],
    remove: &[String],
) -> SimResult<Value> {
    let mailbox = store.mailbox_mut(user_id)?;
    let thread = find(mailbox, id)?.clone();
    let message_ids = message_ids(&thread);

    for message_id in &message_ids {
        messages::relabel(mailbox, message_id, add, remove)?;
    }
    mailbox.record_history("labelsModified", &message_ids);
    Ok(Value::Object(thread))
}

pub(crate) fn link(mailbox: &mut Mailbox, thread_id: &str, message_id: &str) {
    if let Some(thread) = mailbox.threads.get_mut(thread_id) {
        if let Some(Value::Array(ids)) = thread.get_mut("messageIds") {
            if !ids.iter().any(|id| id.as_str() == Some(message_id)) {
                ids.push(json!(message_id));
            }
            return;
        }
        thread.insert("messageIds".to_string(), json!([message_id]));
        return;
    }

    let mut thread = Entity::new();
    thread.insert("id".to_string(), json!(thread_id));
    thread.insert("messageIds".to_string(), json!([message_id]));
    mailbox.threads.insert(thread);
}

/// Drops the message from its thread, removing the thread once empty.
pub(crate) fn unlink(mailbox: &mut Mailbox, thread_id: &str, message_id: &str) {
    let emptied = match mailbox
        .threads
        .get_mut(thread_id)
        .and_then(|thread| thread.get_mut("messageIds"))
    {
        Some(Value::Array(ids)) => {
            ids.retain(|id| id.as_str() != Some(message_id));
            ids.is_empty()
        }
        _ => false,
    };
    if emptied {
        mailbox.threads.delete(thread_id);
    }
}

fn find<'a>(mailbox: &'a Mailbox, id: &str) -> SimResult<&'a Entity> {
    mailbox
        .threads
        .get(id)
        .ok_or_else(|| SimError::not_found(format!("thread {id}")))
}

fn message_ids(thread: &Entity) -> Vec<String> {
    thread
        .get("messageIds")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(ToString::to_string)
        .collect()
}

fn thread_messages(mailbox: &Mailbox, thread: &Entity) -> Vec<Value> {
    message_ids(thread)
        .iter()
        .filter_map(|id| mailbox.messages.get(id))
        .map(|message| Value::Object(message.clone()))
        .collect()
}
