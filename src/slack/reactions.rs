use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};

use super::{Message, Reaction, SlackStore, cursor_page, to_json};

fn required(args: &[&str]) -> SimResult<()> {
    if args.iter().any(|arg| arg.trim().is_empty()) {
        return Err(SimError::invalid("missing_required_arguments"));
    }
    Ok(())
}

fn message_mut<'a>(store: &'a mut SlackStore, channel: &str, ts: &str) -> SimResult<&'a mut Message> {
    store
        .channel_mut(channel)?
        .message_mut(ts)
        .ok_or_else(|| SimError::not_found("message_not_found"))
}

/// `reactions.add`. A user reacts at most once per emoji.
pub fn add(store: &mut SlackStore, user_id: &str, channel: &str, name: &str, ts: &str) -> SimResult<Value> {
    required(&[user_id, channel, name, ts])?;
    let message = message_mut(store, channel, ts)?;

    match message.reactions.iter().position(|reaction| reaction.name == name) {
        Some(index) => {
            let reaction = &mut message.reactions[index];
            if reaction.users.iter().any(|user| user == user_id) {
                return Err(SimError::invalid("already_reacted"));
            }
            reaction.users.push(user_id.to_string());
            reaction.count += 1;
        }
        None => message.reactions.push(Reaction {
            name: name.to_string(),
            users: vec![user_id.to_string()],
            count: 1,
        }),
    }
    debug!(%channel, %ts, %name, %user_id, "reaction added");
    Ok(json!({ "message": to_json(&*message) }))
}

/// `reactions.remove`. The emoji disappears once nobody reacts with it.
pub fn remove(store: &mut SlackStore, user_id: &str, name: &str, channel: &str, ts: &str) -> SimResult<Value> {
    required(&[user_id, name, channel, ts])?;
    let message = message_mut(store, channel, ts)?;
    if message.reactions.is_empty() {
        return Err(SimError::invalid("no_reactions_on_message"));
    }

    let index = message
        .reactions
        .iter()
        .position(|reaction| reaction.name == name)
        .ok_or_else(|| SimError::not_found("reaction_not_found"))?;
    let reaction = &mut message.reactions[index];
    let user = reaction
        .users
        .iter()
        .position(|user| user == user_id)
        .ok_or_else(|| SimError::invalid("user_has_not_reacted"))?;
    reaction.users.remove(user);
    reaction.count = reaction.count.saturating_sub(1);
    if reaction.count == 0 {
        message.reactions.remove(index);
    }
    debug!(%channel, %ts, %name, %user_id, "reaction removed");
    Ok(json!({}))
}

/// `reactions.get`: every reaction with `full`, otherwise a count per emoji.
pub fn get(store: &SlackStore, channel: &str, ts: &str, full: bool) -> SimResult<Value> {
    if channel.trim().is_empty() {
        return Err(SimError::invalid("missing_channel_id"));
    }
    if ts.trim().is_empty() {
        return Err(SimError::invalid("missing_message_ts"));
    }
    let message = store
        .channel(channel)?
        .message(ts)
        .ok_or_else(|| SimError::not_found("message_not_found"))?;

    if full {
        return Ok(json!({ "reactions": message.reactions }));
    }
    let summary = message
        .reactions
        .iter()
        .fold(BTreeMap::<&str, u64>::new(), |mut summary, reaction| {
            *summary.entry(reaction.name.as_str()).or_default() += reaction.count;
            summary
        });
    Ok(json!({ "reactions": summary }))
}

/// `reactions.list` across every channel, optionally for one user.
pub fn list(
    store: &SlackStore,
    user_id: Option<&str>,
    full: bool,
    cursor: Option<&str>,
    limit: Option<usize>,
) -> SimResult<Value> {
    let reactions = store
        .db
        .channels
        .iter()
        .flat_map(|channel| {
            channel.messages.iter().flat_map(move |message| {
                message.reactions.iter().map(move |reaction| (channel, message, reaction))
            })
        })
        .filter(|(_, _, reaction)| {
            user_id.is_none_or(|user| reaction.users.iter().any(|reacted| reacted == user))
        })
        .map(|(channel, message, reaction)| {
            let users = if full { json!(reaction.users) } else { Value::Null };
            json!({
                "channel": channel.id,
                "message_ts": message.ts,
                "name": reaction.name,
                "count": reaction.count,
                "users": users,
            })
        })
        .collect::<Vec<_>>();

    let page = cursor_page(reactions, cursor, limit.unwrap_or(100))?;
    Ok(json!({
        "reactions": page.items,
        "response_metadata": { "next_cursor": page.next_page_token },
    }))
}
