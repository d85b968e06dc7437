use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, object, str_field};

use super::{RedditStore, prefixed_id};

const LAYOUTS: [&str; 2] = ["TIMELINE", "GALLERY"];

fn collection_mut<'a>(store: &'a mut RedditStore, collection_id: &str) -> SimResult<&'a mut Entity> {
    store
        .db
        .collections
        .get_mut(collection_id)
        .ok_or_else(|| SimError::not_found("No such collection"))
}

/// Runs `change` on the collection's link list and stores the result.
fn edit_links<T>(collection: &mut Entity, change: impl FnOnce(&mut Vec<Value>) -> T) -> T {
    let mut links = match collection.remove("links") {
        Some(Value::Array(links)) => links,
        _ => Vec::new(),
    };
    let outcome = change(&mut links);
    collection.insert("links".to_string(), Value::Array(links));
    outcome
}

pub fn create(store: &mut RedditStore, title: &str, sr_fullname: &str) -> SimResult<Value> {
    if title.trim().is_empty() {
        return Err(SimError::invalid("Collection title is required"));
    }
    let id = prefixed_id(&mut store.db.collections, "col");
    store.db.collections.insert(object(json!({
        "id": id,
        "title": title,
        "sr_fullname": sr_fullname,
        "links": [],
        "description": "",
        "display_layout": "TIMELINE",
    })));
    debug!(%id, %sr_fullname, "collection created");
    Ok(json!({ "status": "collection_created", "collection_id": id }))
}

pub fn get(store: &RedditStore, collection_id: &str) -> SimResult<Value> {
    store
        .db
        .collections
        .get(collection_id)
        .map(|collection| json!(collection))
        .ok_or_else(|| SimError::not_found("Collection not found"))
}

pub fn delete(store: &mut RedditStore, collection_id: &str) -> SimResult<Value> {
    store
        .db
        .collections
        .delete(collection_id)
        .ok_or_else(|| SimError::not_found("Collection not found"))?;
    debug!(%collection_id, "collection deleted");
    Ok(json!({ "status": "collection_deleted", "collection_id": collection_id }))
}

/// Appends the link unless the collection already holds it.
pub fn add_post(store: &mut RedditStore, collection_id: &str, link_fullname: &str) -> SimResult<Value> {
    let collection = store
        .db
        .collections
        .get_mut(collection_id)
        .ok_or_else(|| SimError::not_found("Collection does not exist"))?;
    edit_links(collection, |links| {
        if !links.iter().any(|link| link.as_str() == Some(link_fullname)) {
            links.push(json!(link_fullname));
        }
    });
    debug!(%collection_id, %link_fullname, "post added to collection");
    Ok(json!({ "status": "success", "collection_id": collection_id, "added_link": link_fullname }))
}

pub fn remove_post(store: &mut RedditStore, link_fullname: &str, collection_id: &str) -> SimResult<Value> {
    let removed = edit_links(collection_mut(store, collection_id)?, |links| {
        let index = links.iter().position(|link| link.as_str() == Some(link_fullname))?;
        Some(links.remove(index))
    });
    if removed.is_none() {
        return Err(SimError::not_found("Link not found in collection"));
    }
    debug!(%collection_id, %link_fullname, "post removed from collection");
    Ok(json!({ "status": "success", "removed_link": link_fullname }))
}

/// Replaces the link order wholesale.
pub fn reorder(store: &mut RedditStore, collection_id: &str, link_fullnames: &[&str]) -> SimResult<Value> {
    let collection = collection_mut(store, collection_id)?;
    collection.insert("links".to_string(), json!(link_fullnames));
    debug!(%collection_id, links = link_fullnames.len(), "collection reordered");
    Ok(json!({ "status": "success", "collection_id": collection_id, "new_order": link_fullnames }))
}

pub fn subreddit_collections(store: &RedditStore, sr_fullname: &str) -> SimResult<Value> {
    let found = store
        .db
        .collections
        .iter()
        .filter(|collection| str_field(collection, "sr_fullname") == sr_fullname)
        .collect::<Vec<_>>();
    Ok(json!(found))
}

pub fn update_description(store: &mut RedditStore, collection_id: &str, description: &str) -> SimResult<Value> {
    collection_mut(store, collection_id)?.insert("description".to_string(), json!(description));
    Ok(json!({ "status": "success", "collection_id": collection_id, "new_description": description }))
}

/// Layout is `TIMELINE` or `GALLERY`, in any case.
pub fn update_display_layout(store: &mut RedditStore, collection_id: &str, display_layout: &str) -> SimResult<Value> {
    let layout = display_layout.to_ascii_uppercase();
    if !LAYOUTS.contains(&layout.as_str()) {
        return Err(SimError::invalid(format!("invalid display layout: {display_layout}")));
    }
    collection_mut(store, collection_id)?.insert("display_layout".to_string(), json!(layout));
    Ok(json!({ "status": "success", "collection_id": collection_id, "display_layout": layout }))
}

pub fn update_title(store: &mut RedditStore, collection_id: &str, title: &str) -> SimResult<Value> {
    if title.trim().is_empty() {
        return Err(SimError::invalid("Collection title is required"));
    }
    collection_mut(store, collection_id)?.insert("title".to_string(), json!(title));
    Ok(json!({ "status": "success", "collection_id": collection_id, "new_title": title }))
}
