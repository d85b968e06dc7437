use serde_json::Value;
use tracing::debug;

use crate::error::SimResult;

use super::WorkdayStore;
use super::resources::{Lookup, Relation, Resource, entity_mut, link, unlink};

/// Links supplier companies or contacts to a project.
pub fn add_suppliers(
    store: &mut WorkdayStore,
    project: Lookup<'_>,
    relation: Relation,
    ids: &[Value],
) -> SimResult<Value> {
    let found = entity_mut(store, Resource::Projects, project)?;
    link(found, relation.field(), ids);
    debug!(%project, field = relation.field(), added = ids.len(), "project suppliers added");
    Ok(Value::Object(found.clone()))
}

pub fn remove_suppliers(
    store: &mut WorkdayStore,
    project: Lookup<'_>,
    relation: Relation,
    ids: &[Value],
) -> SimResult<Value> {
    let found = entity_mut(store, Resource::Projects, project)?;
    unlink(found, relation.field(), ids);
    debug!(%project, field = relation.field(), "project suppliers removed");
    Ok(Value::Object(found.clone()))
}
