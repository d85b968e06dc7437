use serde_json::{Value, json};

use crate::error::SimResult;
use crate::store::{Entity, id_string};

use super::WorkdayStore;
use super::resources::{DEFAULT_PAGE_SIZE, Resource};

const SELF_LINK: &str = "services/attachments/v1/attachments";

fn wanted(attachment: &Entity, ids: &[&str]) -> bool {
    attachment
        .get("id")
        .and_then(id_string)
        .is_some_and(|id| ids.iter().any(|wanted| *wanted == id))
}

fn split(ids: &str) -> Vec<&str> {
    ids.split(',').map(str::trim).filter(|id| !id.is_empty()).collect()
}

/// Attachments whose id is in the comma-separated `ids`, at most 50.
pub fn list_by_ids(store: &WorkdayStore, ids: &str) -> SimResult<Value> {
    let ids = split(ids);
    let found = store
        .entities(Resource::Attachments)
        .filter(|attachment| wanted(attachment, &ids))
        .take(DEFAULT_PAGE_SIZE)
        .cloned()
        .map(Value::Object)
        .collect::<Vec<_>>();
    Ok(Value::Array(found))
}

/// The list document with `data`, `links` and `meta`.
pub fn list(store: &WorkdayStore, filter_ids: Option<&str>) -> SimResult<Value> {
    let ids = filter_ids.map(split);
    let data = store
        .entities(Resource::Attachments)
        .filter(|attachment| ids.as_deref().is_none_or(|ids| wanted(attachment, ids)))
        .take(DEFAULT_PAGE_SIZE)
        .cloned()
        .map(Value::Object)
        .collect::<Vec<_>>();
    Ok(json!({
        "meta": { "count": data.len() },
        "data": data,
        "links": { "self": SELF_LINK },
    }))
}
