//! Links (`t3_`) and comments (`t1_`).

use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Collection, bool_field, object};

use super::{RedditStore, prefixed_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Thing {
    Comment,
    Link,
}

impl Thing {
    fn label(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Link => "link",
        }
    }

    fn collection(self, store: &mut RedditStore) -> &mut Collection {
        match self {
            Self::Comment => &mut store.db.comments,
            Self::Link => &mut store.db.links,
        }
    }
}

/// Comments are looked up before links.
fn locate(store: &RedditStore, id: &str) -> SimResult<Thing> {
    if store.db.comments.contains(id) {
        Ok(Thing::Comment)
    } else if store.db.links.contains(id) {
        Ok(Thing::Link)
    } else {
        Err(SimError::not_found("not_found"))
    }
}

pub fn comment(store: &mut RedditStore, parent: &str, text: &str) -> SimResult<Value> {
    if parent.trim().is_empty() {
        return Err(SimError::invalid("parent is required"));
    }
    let id = prefixed_id(&mut store.db.comments, "t1");
    store.db.comments.insert(object(json!({
        "id": id,
        "parent": parent,
        "body": text,
        "deleted": false,
    })));
    debug!(%id, %parent, "comment posted");
    Ok(json!({ "status": "comment_posted", "comment_id": id, "parent": parent }))
}

/// `POST /api/submit`. `url_or_text` becomes the body.
pub fn submit(
    store: &mut RedditStore,
    sr: &str,
    kind: &str,
    title: &str,
    url_or_text: Option<&str>,
) -> SimResult<Value> {
    if title.trim().is_empty() {
        return Err(SimError::invalid("title is required"));
    }
    let id = prefixed_id(&mut store.db.links, "t3");
    store.db.links.insert(object(json!({
        "id": id,
        "subreddit": sr,
        "kind": kind,
        "title": title,
        "body": url_or_text.unwrap_or_default(),
        "deleted": false,
    })));
    debug!(%id, %sr, "link submitted");
    Ok(json!({ "status": "submitted", "link_id": id }))
}

/// `POST /api/del`: marks the thing deleted; it stays addressable.
pub fn del(store: &mut RedditStore, id: &str) -> SimResult<Value> {
    let thing = locate(store, id)?;
    if let Some(entity) = thing.collection(store).get_mut(id) {
        entity.insert("deleted".to_string(), Value::Bool(true));
    }
    debug!(%id, kind = thing.label(), "thing deleted");
    Ok(json!({ "status": "deleted", "type": thing.label(), "id": id }))
}

/// `POST /api/editusertext`. Deleted things cannot be edited.
pub fn edit_user_text(store: &mut RedditStore, thing_id: &str, text: &str) -> SimResult<Value> {
    let thing = locate(store, thing_id)?;
    let entity = thing
        .collection(store)
        .get_mut(thing_id)
        .ok_or_else(|| SimError::not_found("not_found"))?;
    if bool_field(entity, "deleted") {
        return Err(SimError::invalid(match thing {
            Thing::Comment => "cannot_edit_deleted_comment",
            Thing::Link => "cannot_edit_deleted_post",
        }));
    }
    entity.insert("body".to_string(), json!(text));
    debug!(%thing_id, kind = thing.label(), "text edited");

    Ok(match thing {
        Thing::Comment => json!({ "status": "updated_comment", "comment_id": thing_id }),
        Thing::Link => json!({ "status": "updated_post", "link_id": thing_id }),
    })
}
