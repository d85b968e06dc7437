use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::object;

use super::{RedditStore, prefixed_id};

/// `POST /api/multi/copy`: records a copy of multireddit `from` at path `to`.
pub fn copy(store: &mut RedditStore, from: &str, to: &str) -> SimResult<Value> {
    if from.trim().is_empty() || to.trim().is_empty() {
        return Err(SimError::invalid("both from and to are required"));
    }
    let name = prefixed_id(&mut store.db.multis, "multi");
    store.db.multis.insert(object(json!({ "id": name, "source": from, "path": to })));
    debug!(%name, %from, %to, "multi copied");
    Ok(json!({ "status": "multi_copied", "new_multiname": name }))
}

pub fn mine(store: &RedditStore) -> SimResult<Value> {
    Ok(json!(store.db.multis.list()))
}
