use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::str_field;

use super::{RedditStore, prefixed_id};

/// `POST /api/widget`. The widget is stored as given plus its id.
pub fn add(store: &mut RedditStore, widget_data: Value) -> SimResult<Value> {
    let Value::Object(mut widget) = widget_data else {
        return Err(SimError::invalid("widget data must be an object"));
    };
    let id = prefixed_id(&mut store.db.widgets, "widget");
    widget.insert("id".to_string(), json!(id));
    store.db.widgets.insert(widget);
    debug!(%id, "widget added");
    Ok(json!({ "status": "widget_created", "widget_id": id }))
}

pub fn delete(store: &mut RedditStore, widget_id: &str) -> SimResult<Value> {
    store
        .db
        .widgets
        .delete(widget_id)
        .ok_or_else(|| SimError::not_found("widget_not_found"))?;
    debug!(%widget_id, "widget deleted");
    Ok(json!({ "status": "widget_deleted", "widget_id": widget_id }))
}

/// Widgets keyed by id.
pub fn list(store: &RedditStore) -> SimResult<Value> {
    let widgets = store
        .db
        .widgets
        .iter()
        .map(|widget| (str_field(widget, "id").to_string(), Value::Object(widget.clone())))
        .collect::<Map<_, _>>();
    Ok(json!({ "widgets": widgets }))
}
