use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};

use super::{
    Channel, Message, SlackStore, cursor_page, hashed_id, now_ts, random_chars, require, split_list,
    to_json, ts_micros,
};

const TYPES: [&str; 4] = ["public_channel", "private_channel", "mpim", "im"];

/// Bounds and cursor shared by `conversations.history` and `conversations.replies`.
#[derive(Debug, Clone, Default)]
pub struct HistoryParams<'a> {
    /// `ts` of the last message already seen.
    pub cursor: Option<&'a str>,
    pub inclusive: bool,
    pub latest: Option<&'a str>,
    pub limit: Option<usize>,
    pub oldest: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct ListConversations<'a> {
    pub cursor: Option<&'a str>,
    pub exclude_archived: bool,
    pub limit: Option<usize>,
    pub team_id: Option<&'a str>,
    pub types: Option<&'a str>,
}

/// `conversations.create`. Names are unique across channels.
pub fn create(store: &mut SlackStore, name: &str, is_private: bool, team_id: Option<&str>) -> SimResult<Value> {
    let name = require(Some(name), "missing_name")?;
    if store.db.name_taken(name) {
        return Err(SimError::invalid("name_taken"));
    }

    let id = hashed_id('C', name, |candidate| store.db.has_channel(candidate));
    let mut channel = Channel::new(id.clone(), name);
    channel.is_private = is_private;
    channel.team_id = team_id.map(ToString::to_string);
    let reply = json!({ "channel": to_json(&channel) });
    store.db.channels.push(channel);
    debug!(%id, %name, "channel created");
    Ok(reply)
}

pub fn archive(store: &mut SlackStore, channel: &str) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    store.channel_mut(channel)?.is_archived = true;
    debug!(%channel, "channel archived");
    Ok(json!({}))
}

pub fn close(store: &mut SlackStore, channel: &str) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    store.channel_mut(channel)?.is_open = false;
    debug!(%channel, "channel closed");
    Ok(json!({}))
}

pub fn rename(store: &mut SlackStore, channel: &str, name: &str) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let name = require(Some(name), "invalid_name")?;
    store.channel(channel)?;
    if store.db.name_taken(name) {
        return Err(SimError::invalid("name_taken"));
    }

    store.channel_mut(channel)?.name = name.to_string();
    debug!(%channel, %name, "channel renamed");
    Ok(json!({ "channel": { "id": channel, "name": name } }))
}

pub fn set_purpose(store: &mut SlackStore, channel: &str, purpose: &str) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let purpose = require(Some(purpose), "missing_purpose")?;
    store.channel_mut(channel)?.conversations.purpose = Some(purpose.to_string());
    Ok(json!({ "purpose": purpose }))
}

pub fn set_topic(store: &mut SlackStore, channel: &str, topic: &str) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let topic = require(Some(topic), "missing_topic")?;
    store.channel_mut(channel)?.conversations.topic = Some(topic.to_string());
    Ok(json!({ "topic": topic }))
}

/// `conversations.mark`: moves the read cursor.
pub fn mark(store: &mut SlackStore, channel: &str, ts: &str) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let ts = require(Some(ts), "missing_timestamp")?;
    store.channel_mut(channel)?.conversations.read_cursor = Some(ts.to_string());
    Ok(json!({}))
}

/// `conversations.invite`. Unknown users fail the call unless `force` is
/// set, in which case they are skipped.
pub fn invite(store: &mut SlackStore, channel: &str, users: &str, force: bool) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let users = require(Some(users), "missing_users")?;

    let (valid, invalid): (Vec<&str>, Vec<&str>) =
        split_list(users).into_iter().partition(|user| store.user_exists(user));
    if !force && !invalid.is_empty() {
        return Err(SimError::invalid("invalid_user_ids"));
    }

    let members = &mut store.channel_mut(channel)?.conversations.members;
    for user in &valid {
        if !members.iter().any(|member| member == user) {
            members.push(user.to_string());
        }
    }
    debug!(%channel, invited = valid.len(), skipped = invalid.len(), "users invited");
    Ok(json!({ "channel": channel, "invited": valid }))
}

pub fn join(store: &mut SlackStore, user_id: &str, channel: &str) -> SimResult<Value> {
    let user_id = require(Some(user_id), "missing_user_id")?;
    let channel = require(Some(channel), "missing_channel")?;
    if !store.user_exists(user_id) {
        return Err(SimError::not_found("user_not_found"));
    }

    let target = store.channel_mut(channel)?;
    if target.is_member(user_id) {
        return Err(SimError::invalid("already_in_channel"));
    }
    target.conversations.members.push(user_id.to_string());
    debug!(%channel, %user_id, "user joined");
    Ok(json!({ "channel": channel }))
}

pub fn leave(store: &mut SlackStore, user_id: &str, channel: &str) -> SimResult<Value> {
    let user_id = require(Some(user_id), "missing_user_id")?;
    let channel = require(Some(channel), "missing_channel")?;
    remove_member(store, channel, user_id, "not_in_conversation")?;
    debug!(%channel, %user_id, "user left");
    Ok(json!({}))
}

pub fn kick(store: &mut SlackStore, channel: &str, user_id: &str) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let user_id = require(Some(user_id), "missing_user_id")?;
    remove_member(store, channel, user_id, "user_not_in_channel")?;
    debug!(%channel, %user_id, "user kicked");
    Ok(json!({}))
}

fn remove_member(store: &mut SlackStore, channel: &str, user_id: &str, absent: &str) -> SimResult<()> {
    let members = &mut store.channel_mut(channel)?.conversations.members;
    let index = members
        .iter()
        .position(|member| member == user_id)
        .ok_or_else(|| SimError::invalid(absent))?;
    members.remove(index);
    Ok(())
}

/// `conversations.members`, paged by index cursor.
pub fn members(store: &SlackStore, channel: &str, cursor: Option<&str>, limit: Option<usize>) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let members = store.channel(channel)?.conversations.members.clone();
    let page = cursor_page(members, cursor, limit.unwrap_or(100))?;
    Ok(json!({
        "members": page.items,
        "response_metadata": { "next_cursor": page.next_page_token.unwrap_or_default() },
    }))
}

/// `conversations.list`. `types` is a comma list of conversation types.
pub fn list(store: &SlackStore, params: &ListConversations<'_>) -> SimResult<Value> {
    let limit = params.limit.unwrap_or(100);
    if limit > 1000 {
        return Err(SimError::invalid("invalid_limit"));
    }
    let types = requested_types(params.types)?;

    let channels = store
        .db
        .channels
        .iter()
        .filter(|channel| !(params.exclude_archived && channel.is_archived))
        .filter(|channel| types.iter().any(|kind| *kind == channel.kind()))
        .filter(|channel| params.team_id.is_none_or(|team| channel.team_id.as_deref() == Some(team)))
        .map(to_json)
        .collect::<Vec<_>>();

    let page = cursor_page(channels, params.cursor, limit)?;
    Ok(json!({
        "channels": page.items,
        "response_metadata": { "next_cursor": page.next_page_token },
    }))
}

/// Parsed `types` argument; absent means public channels only.
pub(crate) fn requested_types(types: Option<&str>) -> SimResult<Vec<&str>> {
    match types.map(split_list) {
        None => Ok(vec!["public_channel"]),
        Some(list) if list.is_empty() => Ok(vec!["public_channel"]),
        Some(list) => {
            if list.iter().any(|kind| !TYPES.contains(kind)) {
                return Err(SimError::invalid("invalid_types"));
            }
            Ok(list)
        }
    }
}

/// `conversations.open`: resumes a channel, or opens a direct conversation
/// with `users` (comma separated). The same set of users always maps to the
/// same conversation.
pub fn open(
    store: &mut SlackStore,
    channel: Option<&str>,
    users: Option<&str>,
    prevent_creation: bool,
) -> SimResult<Value> {
    let channel = channel.map(str::trim).filter(|channel| !channel.is_empty());
    let users = users.map(str::trim).filter(|users| !users.is_empty());

    match (channel, users) {
        (None, None) => Err(SimError::invalid("missing_channel_or_users")),
        (Some(_), Some(_)) => Err(SimError::invalid("invalid_arguments")),
        (Some(channel), None) => {
            let found = store.channel_mut(channel)?;
            found.is_open = true;
            Ok(json!({ "channel": to_json(&*found) }))
        }
        (None, Some(users)) => {
            let mut participants = split_list(users)
                .into_iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            participants.sort();
            participants.dedup();

            if let Some(existing) = store
                .db
                .channels
                .iter()
                .find(|channel| {
                    !channel.conversations.users.is_empty()
                        && channel.conversations.users == participants
                })
            {
                return Ok(json!({
                    "channel": { "id": existing.id, "users": existing.conversations.users },
                    "already_open": true,
                }));
            }
            if prevent_creation {
                return Err(SimError::not_found("conversation_not_found"));
            }

            let mut rng = rand::thread_rng();
            let id = loop {
                let candidate = format!("C{}", random_chars(&mut rng, 8));
                if !store.db.has_channel(&candidate) {
                    break candidate;
                }
            };
            let mut conversation = Channel::new(id.clone(), participants.join(","));
            conversation.kind = Some(if participants.len() > 2 { "mpim" } else { "im" }.to_string());
            conversation.conversations.users = participants.clone();
            conversation.conversations.members = participants.clone();
            store.db.channels.push(conversation);
            debug!(%id, users = participants.len(), "direct conversation opened");
            Ok(json!({ "channel": { "id": id, "users": participants } }))
        }
    }
}

/// `conversations.history`: top-level messages within the bounds, oldest
/// first. The cursor is the `ts` of the last message of the previous page.
pub fn history(store: &SlackStore, channel: &str, params: &HistoryParams<'_>) -> SimResult<Value> {
    let channel = require(Some(channel), "missing_channel")?;
    let messages = &store.channel(channel)?.messages;
    let limit = params.limit.filter(|limit| *limit > 0).unwrap_or(100).min(999);
    let window = window(messages, params, limit)?;
    Ok(json!({
        "messages": window.messages,
        "has_more": window.has_more,
        "response_metadata": { "next_cursor": window.next_cursor },
    }))
}

/// `conversations.replies`: replies in the thread started by `ts`.
pub fn replies(store: &SlackStore, channel: &str, ts: &str, params: &HistoryParams<'_>) -> SimResult<Value> {
    if channel.trim().is_empty() || ts.trim().is_empty() {
        return Err(SimError::invalid("missing_required_arguments"));
    }
    let parent = store
        .channel(channel)?
        .message(ts)
        .ok_or_else(|| SimError::not_found("thread_not_found"))?;

    let limit = params.limit.filter(|limit| *limit > 0).unwrap_or(1000);
    let window = window(&parent.replies, params, limit)?;
    Ok(json!({
        "messages": window.messages,
        "has_more": window.has_more,
        "response_metadata": { "next_cursor": window.next_cursor.unwrap_or_default() },
    }))
}

struct Window {
    messages: Vec<Value>,
    has_more: bool,
    next_cursor: Option<String>,
}

fn window(messages: &[Message], params: &HistoryParams<'_>, limit: usize) -> SimResult<Window> {
    let oldest = bound(params.oldest.unwrap_or("0"), "invalid_ts_oldest")?;
    let latest = bound(params.latest.unwrap_or(&now_ts()), "invalid_ts_latest")?;

    let within = messages
        .iter()
        .filter(|message| {
            ts_micros(&message.ts).is_some_and(|ts| {
                if params.inclusive {
                    oldest <= ts && ts <= latest
                } else {
                    oldest < ts && ts < latest
                }
            })
        })
        .collect::<Vec<_>>();

    let start = match params.cursor.filter(|cursor| !cursor.is_empty()) {
        None => 0,
        Some(cursor) => match within.iter().position(|message| message.ts == cursor) {
            Some(index) => index + 1,
            None => {
                return Ok(Window {
                    messages: Vec::new(),
                    has_more: false,
                    next_cursor: None,
                });
            }
        },
    };

    let end = start.saturating_add(limit).min(within.len());
    Ok(Window {
        messages: within[start..end].iter().map(|message| to_json(*message)).collect(),
        has_more: end < within.len(),
        next_cursor: (end < within.len())
            .then(|| end.checked_sub(1).and_then(|last| within.get(last)))
            .flatten()
            .map(|message| message.ts.clone()),
    })
}

fn bound(raw: &str, code: &str) -> SimResult<i64> {
    ts_micros(raw).ok_or_else(|| SimError::invalid(code))
}
