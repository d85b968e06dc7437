use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::object;

use super::resources::{self, Lookup, Resource};
use super::{WorkdayStore, id_value};

fn no_options(field_id: &str) -> SimError {
    SimError::not_found(format!("Field options for {field_id} not found"))
}

/// The option set of a field: `{"field_id", "options"}`.
pub fn options(store: &WorkdayStore, field_id: &str) -> SimResult<Value> {
    store
        .db
        .field_options
        .get(field_id)
        .cloned()
        .map(Value::Object)
        .ok_or_else(|| no_options(field_id))
}

/// Gives an existing field its first option set.
pub fn set_options(store: &mut WorkdayStore, field_id: &str, options: Vec<Value>) -> SimResult<Value> {
    resources::get(store, Resource::Fields, Lookup::Id(field_id))?;
    if store.db.field_options.contains(field_id) {
        return Err(SimError::invalid(format!("Field {field_id} already has options")));
    }

    let entry = json!({ "field_id": id_value(field_id), "options": options });
    let created = store.db.field_options.insert(object(entry)).clone();
    debug!(%field_id, "field options set");
    Ok(Value::Object(created))
}

/// Replaces the option list.
pub fn patch_options(store: &mut WorkdayStore, field_id: &str, options: Vec<Value>) -> SimResult<Value> {
    let entry = store
        .db
        .field_options
        .get_mut(field_id)
        .ok_or_else(|| no_options(field_id))?;
    entry.insert("options".to_string(), Value::Array(options));
    Ok(Value::Object(entry.clone()))
}

pub fn delete_options(store: &mut WorkdayStore, field_id: &str) -> SimResult<Value> {
    store
        .db
        .field_options
        .delete(field_id)
        .ok_or_else(|| no_options(field_id))?;
    debug!(%field_id, "field options deleted");
    Ok(Value::Null)
}
