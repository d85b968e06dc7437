use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, object, paginate};

use super::{Channel, Message, SlackStore, cursor_page, require, to_json};

/// Fields `chat.update` may change.
const UPDATABLE: [&str; 9] = [
    "attachments",
    "blocks",
    "text",
    "as_user",
    "file_ids",
    "link_names",
    "markdown_text",
    "parse",
    "reply_broadcast",
];

#[derive(Debug, Clone, Default)]
pub struct PostMessage<'a> {
    pub channel: &'a str,
    pub text: Option<&'a str>,
    /// Explicit timestamp; defaults to now.
    pub ts: Option<&'a str>,
    pub thread_ts: Option<&'a str>,
    pub username: Option<&'a str>,
    /// Other message arguments (`blocks`, `attachments`, `mrkdwn`, ...), stored as given.
    pub extra: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ListScheduled<'a> {
    pub channel: Option<&'a str>,
    pub cursor: Option<&'a str>,
    pub latest: Option<&'a str>,
    pub limit: Option<i64>,
    pub oldest: Option<&'a str>,
}

/// `chat.meMessage`. An unknown channel is created on the fly.
pub fn me_message(store: &mut SlackStore, user_id: &str, channel: &str, text: &str) -> SimResult<Value> {
    let channel = require(Some(channel), "invalid_channel")?;
    let text = require(Some(text), "invalid_text")?;

    if !store.db.has_channel(channel) {
        store.db.channels.push(Channel::new(channel, ""));
    }
    let target = store.channel_mut(channel)?;
    let ts = target.next_ts();
    target.messages.push(Message::new(ts.clone(), user_id, text));
    debug!(%channel, %ts, "me message posted");
    Ok(json!({ "channel": channel, "text": text, "ts": ts }))
}

/// `chat.postMessage`. With `thread_ts` the message becomes a reply and the
/// parent message is returned.
pub fn post_message(store: &mut SlackStore, params: &PostMessage<'_>) -> SimResult<Value> {
    let channel_id = require(Some(params.channel), "no_channel")?;
    let target = store.channel_mut(channel_id)?;

    let ts = match params.ts {
        Some(ts) if !ts.trim().is_empty() => ts.to_string(),
        _ => target.next_ts(),
    };
    let mut message = Message::new(ts, params.username.unwrap_or("bot"), params.text.unwrap_or(""));
    message.absorb(&params.extra);
    message.extra.insert("channel".to_string(), json!(channel_id));
    if let Some(username) = params.username {
        message.extra.insert("username".to_string(), json!(username));
    }

    if let Some(thread_ts) = params.thread_ts {
        message.extra.insert("thread_ts".to_string(), json!(thread_ts));
        let parent = target
            .message_mut(thread_ts)
            .ok_or_else(|| SimError::not_found("thread_not_found"))?;
        parent.replies.push(message);
        debug!(channel = %channel_id, %thread_ts, "thread reply posted");
        return Ok(json!({ "channel": channel_id, "ts": thread_ts, "message": to_json(&*parent) }));
    }

    let reply = json!({ "channel": channel_id, "ts": message.ts, "message": to_json(&message) });
    debug!(channel = %channel_id, ts = %message.ts, "message posted");
    target.messages.push(message);
    Ok(reply)
}

/// `chat.postEphemeral`. Ephemeral messages never enter channel history.
pub fn post_ephemeral(
    store: &mut SlackStore,
    channel: &str,
    user: &str,
    text: Option<&str>,
    extra: Value,
) -> SimResult<Value> {
    if channel.trim().is_empty() || user.trim().is_empty() {
        return Err(SimError::invalid("missing_required_arguments"));
    }

    let mut message = object(extra);
    message.retain(|_, value| !value.is_null());
    message.insert("channel".to_string(), json!(channel));
    message.insert("user".to_string(), json!(user));
    message.insert("text".to_string(), json!(text));
    store.db.ephemeral_messages.push(message.clone());
    debug!(%channel, %user, "ephemeral message posted");
    Ok(json!({ "message": message }))
}

pub fn delete(store: &mut SlackStore, channel: &str, ts: &str) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let ts = require(Some(ts), "missing_timestamp")?;
    let target = store.channel_mut(channel)?;

    let before = target.messages.len();
    target.messages.retain(|message| message.ts != ts);
    if target.messages.len() == before {
        return Err(SimError::not_found("message_not_found"));
    }
    debug!(%channel, %ts, "message deleted");
    Ok(json!({ "channel": channel, "ts": ts }))
}

/// `chat.update`: copies the non-null updatable fields of `fields`.
pub fn update(store: &mut SlackStore, channel: &str, ts: &str, fields: Value) -> SimResult<Value> {
    let channel = require(Some(channel), "channel_not_found")?;
    let ts = require(Some(ts), "invalid_timestamp")?;
    let message = store
        .channel_mut(channel)?
        .message_mut(ts)
        .ok_or_else(|| SimError::not_found("message_not_found"))?;

    let mut changes = object(fields);
    changes.retain(|key, _| UPDATABLE.contains(&key.as_str()));
    message.absorb(&Value::Object(changes));
    debug!(%channel, %ts, "message updated");
    Ok(json!({ "channel": channel, "ts": ts, "message": to_json(&*message) }))
}

/// `chat.scheduleMessage`. `post_at` is epoch seconds, fractions dropped.
pub fn schedule_message(
    store: &mut SlackStore,
    user_id: &str,
    channel: &str,
    post_at: &str,
    extra: Value,
) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let post_at = require(Some(post_at), "missing_post_at")?;
    let post_at = post_at
        .parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite())
        .ok_or_else(|| SimError::invalid("invalid_post_at"))? as i64;

    let mut message = object(extra);
    message.retain(|key, value| !value.is_null() && key != "message_id");
    message.insert("user_id".to_string(), json!(user_id));
    message.insert("channel".to_string(), json!(channel));
    message.insert("post_at".to_string(), json!(post_at));
    let scheduled = store.db.scheduled_messages.create(message);
    let id = scheduled.get("message_id").cloned().unwrap_or(Value::Null);
    debug!(%channel, %post_at, message_id = %id, "message scheduled");

    Ok(json!({
        "channel": channel,
        "post_at": post_at,
        "message_id": id,
        "scheduled_message_id": id.to_string(),
    }))
}

pub fn delete_scheduled_message(
    store: &mut SlackStore,
    channel: &str,
    scheduled_message_id: &str,
) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let id = require(Some(scheduled_message_id), "missing_scheduled_message_id")?;

    let matches = store
        .db
        .scheduled_messages
        .get(id)
        .is_some_and(|message| message.get("channel").and_then(Value::as_str) == Some(channel));
    if !matches {
        return Err(SimError::not_found("scheduled_message_not_found"));
    }
    store.db.scheduled_messages.delete(id);
    debug!(%channel, %id, "scheduled message deleted");
    Ok(json!({}))
}

/// `chat.scheduledMessages.list`: `oldest` and `latest` bound `post_at`
/// inclusively.
pub fn scheduled_messages_list(store: &SlackStore, params: &ListScheduled<'_>) -> SimResult<Value> {
    let oldest = bound(params.oldest, "invalid_oldest_timestamp")?;
    let latest = bound(params.latest, "invalid_latest_timestamp")?;
    let limit = match params.limit {
        Some(limit) if limit < 0 => return Err(SimError::invalid("invalid_limit")),
        Some(limit) => usize::try_from(limit).unwrap_or(usize::MAX),
        None => usize::MAX,
    };

    let messages = store
        .db
        .scheduled_messages
        .iter()
        .filter(|message| {
            params
                .channel
                .is_none_or(|channel| message.get("channel").and_then(Value::as_str) == Some(channel))
        })
        .filter(|message| {
            let post_at = message.get("post_at").and_then(Value::as_i64).unwrap_or(0);
            oldest.is_none_or(|oldest| post_at >= oldest) && latest.is_none_or(|latest| post_at <= latest)
        })
        .cloned()
        .collect::<Vec<Entity>>();

    let page = match params.limit {
        Some(_) => cursor_page(messages, params.cursor, limit)?,
        None => paginate(messages, 0, limit),
    };
    Ok(json!({
        "scheduled_messages": page.items,
        "response_metadata": { "next_cursor": page.next_page_token },
    }))
}

fn bound(raw: Option<&str>, code: &str) -> SimResult<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|seconds| seconds.is_finite())
            .map(|seconds| Some(seconds as i64))
            .ok_or_else(|| SimError::invalid(code)),
    }
}
