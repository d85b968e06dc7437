use serde_json::Value;

use crate::error::SimResult;
use crate::store::{Entity, bool_field, same_id, str_field};

use super::resources::Resource;
use super::{WorkdayStore, id_value};

#[derive(Debug, Clone, Default)]
pub struct AwardFilter<'a> {
    /// Accepted states. Empty accepts any.
    pub states: &'a [&'a str],
    /// Inclusive bounds on `updated_at`, compared as ISO-8601 strings.
    pub updated_from: Option<&'a str>,
    pub updated_to: Option<&'a str>,
}

impl AwardFilter<'_> {
    fn accepts(&self, award: &Entity) -> bool {
        let updated = str_field(award, "updated_at");
        (self.states.is_empty() || self.states.iter().any(|state| *state == str_field(award, "state")))
            && self.updated_from.is_none_or(|from| updated >= from)
            && self.updated_to.is_none_or(|to| updated <= to)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LineItemFilter<'a> {
    pub quoted: Option<bool>,
    /// Accepted `line_item_type` values. Empty accepts any.
    pub types: &'a [&'a str],
}

pub fn list(store: &WorkdayStore, filter: &AwardFilter<'_>) -> SimResult<Value> {
    Ok(collect(
        store
            .entities(Resource::Awards)
            .filter(|award| filter.accepts(award)),
    ))
}

/// Line items of one award.
pub fn line_items(store: &WorkdayStore, award_id: &str, filter: &LineItemFilter<'_>) -> SimResult<Value> {
    let award = id_value(award_id);
    Ok(collect(store.entities(Resource::AwardLineItems).filter(|item| {
        item.get("award_id").is_some_and(|found| same_id(found, &award))
            && filter.quoted.is_none_or(|quoted| bool_field(item, "is_quoted") == quoted)
            && (filter.types.is_empty() || filter.types.iter().any(|kind| *kind == str_field(item, "line_item_type")))
    })))
}

fn collect<'a>(entities: impl Iterator<Item = &'a Entity>) -> Value {
    Value::Array(entities.cloned().map(Value::Object).collect())
}
