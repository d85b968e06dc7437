//! `search.messages`, `search.files` and `search.all`.
//!
//! Query modifiers: `from:@user`, `in:#channel`, `to:@user`,
//! `after:`/`before:` (YYYY-MM-DD, exclusive), `during:` (YYYY, YYYY-MM or
//! YYYY-MM-DD) and `has:link|reaction|star`. Bare words must all appear in
//! the text unless the query contains `OR`, `-word` excludes and `*` is a
//! wildcard.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::SimResult;
use crate::query::{Clause, FieldSpec, Matcher, OrMode, Query, Schema, UnknownField, parse_colon};

use super::{Channel, SlackStore, to_json};

const MESSAGE_SCHEMA: Schema = Schema::new(
    &[
        FieldSpec::new("from", "user", Matcher::Custom(from_user)),
        FieldSpec::new("in", "channel_name", Matcher::Custom(in_channel)),
        FieldSpec::new("to", "channel_members", Matcher::Custom(to_member)),
        FieldSpec::new("after", "ts", Matcher::Custom(after)),
        FieldSpec::new("before", "ts", Matcher::Custom(before)),
        FieldSpec::new("during", "ts", Matcher::Custom(during)),
        FieldSpec::new("has", "", Matcher::Custom(has)),
    ],
    UnknownField::Keyword,
)
.with_keywords(&["text"])
.with_wildcards();

const FILE_SCHEMA: Schema = Schema::new(
    &[
        FieldSpec::new("in", "channel_name", Matcher::Custom(in_channel)),
        FieldSpec::new("has", "", Matcher::Custom(has)),
    ],
    UnknownField::MatchAll,
)
.with_keywords(&["name", "title"])
.with_wildcards();

fn strip<'a>(clause: &'a Clause, sigil: char) -> &'a str {
    clause.value.strip_prefix(sigil).unwrap_or(&clause.value)
}

fn from_user(entity: &Value, clause: &Clause) -> bool {
    entity.get("user").and_then(Value::as_str) == Some(strip(clause, '@'))
}

fn in_channel(entity: &Value, clause: &Clause) -> bool {
    entity.get("channel_name").and_then(Value::as_str) == Some(strip(clause, '#'))
}

fn to_member(entity: &Value, clause: &Clause) -> bool {
    let user = strip(clause, '@');
    entity
        .get("channel_members")
        .and_then(Value::as_array)
        .is_some_and(|members| members.iter().any(|member| member.as_str() == Some(user)))
}

fn has(entity: &Value, clause: &Clause) -> bool {
    let present = |field: &str| match entity.get(field) {
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Bool(flag)) => *flag,
        _ => false,
    };
    match clause.value.as_str() {
        "link" => present("links"),
        "reaction" => present("reactions"),
        "star" => present("is_starred"),
        _ => false,
    }
}

/// Calendar day (UTC) of the message `ts`.
fn day(entity: &Value) -> Option<NaiveDate> {
    let seconds = entity.get("ts")?.as_str()?.trim().parse::<f64>().ok()?;
    DateTime::from_timestamp(seconds.floor() as i64, 0).map(|stamp| stamp.date_naive())
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn after(entity: &Value, clause: &Clause) -> bool {
    matches!((day(entity), parse_day(&clause.value)), (Some(day), Some(bound)) if day > bound)
}

fn before(entity: &Value, clause: &Clause) -> bool {
    matches!((day(entity), parse_day(&clause.value)), (Some(day), Some(bound)) if day < bound)
}

fn during(entity: &Value, clause: &Clause) -> bool {
    let Some(day) = day(entity) else {
        return false;
    };
    let parts = clause
        .value
        .split('-')
        .map(|part| part.parse::<u32>().ok())
        .collect::<Option<Vec<_>>>();
    match parts.as_deref() {
        Some([year]) => day.year() == *year as i32,
        Some([year, month]) => day.year() == *year as i32 && day.month() == *month,
        Some([_, _, _]) => parse_day(&clause.value) == Some(day),
        _ => false,
    }
}

fn parse(query: &str) -> Query {
    parse_colon(query, OrMode::Toggle)
}

/// Channel facts the modifiers need, merged into an entity view.
fn with_channel(mut view: Value, channel: &Channel) -> Value {
    if let Some(fields) = view.as_object_mut() {
        fields.insert("channel_name".to_string(), json!(channel.name));
        fields.insert("channel_members".to_string(), json!(channel.conversations.members));
    }
    view
}

fn matching_messages(store: &SlackStore, query: &Query) -> Vec<Value> {
    store
        .db
        .channels
        .iter()
        .flat_map(|channel| {
            channel
                .messages
                .iter()
                .map(move |message| (to_json(message), with_channel(to_json(message), channel)))
        })
        .filter(|(_, view)| query.matches(view, &MESSAGE_SCHEMA))
        .map(|(message, _)| message)
        .collect()
}

fn matching_files(store: &SlackStore, query: &Query) -> Vec<Value> {
    let mut seen = BTreeSet::new();
    let mut files = Vec::new();
    for channel in &store.db.channels {
        for id in channel.files.keys() {
            let Some(file) = store.db.files.get(id) else {
                continue;
            };
            let view = with_channel(Value::Object(file.clone()), channel);
            if query.matches(&view, &FILE_SCHEMA) && seen.insert(id.as_str()) {
                files.push(Value::Object(file.clone()));
            }
        }
    }
    files
}

pub fn messages(store: &SlackStore, query: &str) -> SimResult<Value> {
    let parsed = parse(query);
    let matches = matching_messages(store, &parsed);
    debug!(%query, hits = matches.len(), "messages searched");
    Ok(json!({ "messages": matches }))
}

/// Files shared into channels whose name or title matches.
pub fn files(store: &SlackStore, query: &str) -> SimResult<Value> {
    let parsed = parse(query);
    let matches = matching_files(store, &parsed);
    debug!(%query, hits = matches.len(), "files searched");
    Ok(json!({ "files": matches }))
}

pub fn all(store: &SlackStore, query: &str) -> SimResult<Value> {
    let parsed = parse(query);
    let messages = matching_messages(store, &parsed);
    let files = matching_files(store, &parsed);
    debug!(%query, messages = messages.len(), files = files.len(), "workspace searched");
    Ok(json!({ "messages": messages, "files": files }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Op;

    fn message(ts: &str) -> Value {
        json!({ "ts": ts, "user": "U1", "text": "hello", "reactions": [], "links": ["https://a"] })
    }

    #[test]
    fn during_accepts_three_granularities() {
        // 2024-03-15T12:00:00Z
        let entity = message("1710504000.000000");
        for value in ["2024", "2024-03", "2024-03-15"] {
            assert!(during(&entity, &Clause::field("during", Op::Has, value)), "{value}");
        }
        assert!(!during(&entity, &Clause::field("during", Op::Has, "2024-04")));
        assert!(!during(&entity, &Clause::field("during", Op::Has, "last-week")));
    }

    #[test]
    fn date_bounds_are_exclusive() {
        let entity = message("1710504000.000000");
        assert!(after(&entity, &Clause::field("after", Op::Has, "2024-03-14")));
        assert!(!after(&entity, &Clause::field("after", Op::Has, "2024-03-15")));
        assert!(before(&entity, &Clause::field("before", Op::Has, "2024-03-16")));
        assert!(!before(&entity, &Clause::field("before", Op::Has, "2024-03-15")));
    }

    #[test]
    fn has_checks_presence() {
        let entity = message("1.0");
        assert!(has(&entity, &Clause::field("has", Op::Has, "link")));
        assert!(!has(&entity, &Clause::field("has", Op::Has, "reaction")));
        assert!(!has(&entity, &Clause::field("has", Op::Has, "star")));
    }
}
