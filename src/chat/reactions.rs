use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::query::{Connectives, FieldSpec, Matcher, Schema, UnknownField, parse_comparison};
use crate::store::object;

use super::messages::space_of;
use super::{ChatStore, fresh_name, has_prefix, page_of, page_size};

const FILTER_SCHEMA: Schema = Schema::new(
    &[
        FieldSpec::new("user.name", "user.name", Matcher::Exact),
        FieldSpec::new("emoji.unicode", "emoji.unicode", Matcher::Exact),
        FieldSpec::new("emoji.custom_emoji.uid", "emoji.customEmoji.uid", Matcher::Exact),
    ],
    UnknownField::MatchNone,
);

/// Adds a reaction to the `parent` message. The reacting user defaults to the caller.
pub fn create(store: &mut ChatStore, parent: &str, reaction: Value) -> SimResult<Value> {
    space_of(parent)?;
    let reaction = object(reaction);
    let user = reaction
        .get("user")
        .cloned()
        .unwrap_or_else(|| json!({ "name": store.current_user() }));

    let name = fresh_name(&mut store.db.reactions, |n| format!("{parent}/reactions/{n}"));
    let entry = object(json!({
        "name": name,
        "emoji": reaction.get("emoji").cloned().unwrap_or_else(|| json!({})),
        "user": user,
    }));
    debug!(%name, "reaction created");
    Ok(Value::Object(store.db.reactions.insert(entry).clone()))
}

/// Reactions on the `parent` message. A filter that does not parse matches nothing.
pub fn list(
    store: &ChatStore,
    parent: &str,
    page_size_hint: Option<usize>,
    page_token: Option<&str>,
    filter: Option<&str>,
) -> SimResult<Value> {
    let query = match filter.map(str::trim) {
        None | Some("") => None,
        Some(filter) => match parse_comparison(filter, Connectives::BOTH) {
            Ok(query) => Some(query),
            Err(err) => {
                debug!(%filter, error = %err, "reaction filter rejected");
                return Ok(json!({ "reactions": [] }));
            }
        },
    };

    let prefix = format!("{parent}/reactions/");
    let reactions = store
        .db
        .reactions
        .iter()
        .filter(|reaction| has_prefix(reaction, &prefix))
        .map(|reaction| Value::Object(reaction.clone()))
        .filter(|reaction| {
            query
                .as_ref()
                .is_none_or(|query| query.matches(reaction, &FILTER_SCHEMA))
        })
        .collect();

    let size = page_size(page_size_hint, 25, 200);
    Ok(page_of("reactions", reactions, page_token, size))
}

pub fn delete(store: &mut ChatStore, name: &str) -> SimResult<Value> {
    store
        .db
        .reactions
        .delete(name)
        .ok_or_else(|| SimError::not_found(format!("reaction {name}")))?;
    debug!(%name, "reaction deleted");
    Ok(json!({}))
}
