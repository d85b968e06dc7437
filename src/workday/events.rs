//! Sourcing events and what hangs off them: worksheets, line items,
//! supplier invitations and bids.

use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, same_id, str_field};

use super::resources::{self, Lookup, Relation, Resource, link, unlink};
use super::{WorkdayStore, id_value};

const RFP: &str = "RFP";

fn belongs_to(entity: &Entity, field: &str, id: &str) -> bool {
    entity.get(field).is_some_and(|found| same_id(found, &id_value(id)))
}

fn collect<'a>(entities: impl Iterator<Item = &'a Entity>) -> Value {
    Value::Array(entities.cloned().map(Value::Object).collect())
}

fn is_rfp(event: &Entity) -> bool {
    str_field(event, "type") == RFP
}

pub fn worksheets(store: &WorkdayStore, event_id: &str) -> SimResult<Value> {
    Ok(collect(
        store
            .entities(Resource::Worksheets)
            .filter(|worksheet| belongs_to(worksheet, "event_id", event_id)),
    ))
}

/// A worksheet, only when it belongs to the event.
pub fn worksheet(store: &WorkdayStore, event_id: &str, id: &str) -> SimResult<Value> {
    let found = resources::get(store, Resource::Worksheets, Lookup::Id(id))?;
    match &found {
        Value::Object(worksheet) if belongs_to(worksheet, "event_id", event_id) => Ok(found),
        _ => Err(SimError::not_found(format!("Worksheet {id} not found"))),
    }
}

pub fn line_items(store: &WorkdayStore, event_id: &str, worksheet_id: &str) -> SimResult<Value> {
    Ok(collect(store.entities(Resource::WorksheetLineItems).filter(|item| {
        belongs_to(item, "event_id", event_id) && belongs_to(item, "worksheet_id", worksheet_id)
    })))
}

fn scoped_line_item(
    store: &WorkdayStore,
    event_id: &str,
    worksheet_id: &str,
    id: &str,
) -> SimResult<Value> {
    let found = resources::get(store, Resource::WorksheetLineItems, Lookup::Id(id))?;
    match &found {
        Value::Object(item)
            if belongs_to(item, "event_id", event_id)
                && belongs_to(item, "worksheet_id", worksheet_id) =>
        {
            Ok(found)
        }
        _ => Err(SimError::not_found(format!("Line item {id} not found"))),
    }
}

pub fn line_item(store: &WorkdayStore, event_id: &str, worksheet_id: &str, id: &str) -> SimResult<Value> {
    scoped_line_item(store, event_id, worksheet_id, id)
}

/// Creates one line item in the event's worksheet.
pub fn create_line_item(
    store: &mut WorkdayStore,
    event_id: &str,
    worksheet_id: &str,
    data: Value,
) -> SimResult<Value> {
    worksheet(store, event_id, worksheet_id)?;
    scoped_create(store, event_id, worksheet_id, super::body(data)?)
}

/// Creates several line items. Nothing is stored if any body is empty.
pub fn create_line_items(
    store: &mut WorkdayStore,
    event_id: &str,
    worksheet_id: &str,
    data: Vec<Value>,
) -> SimResult<Value> {
    worksheet(store, event_id, worksheet_id)?;
    let bodies = data.into_iter().map(super::body).collect::<SimResult<Vec<_>>>()?;

    let mut created = Vec::with_capacity(bodies.len());
    for item in bodies {
        created.push(scoped_create(store, event_id, worksheet_id, item)?);
    }
    debug!(%event_id, %worksheet_id, count = created.len(), "line items created");
    Ok(Value::Array(created))
}

fn scoped_create(
    store: &mut WorkdayStore,
    event_id: &str,
    worksheet_id: &str,
    mut item: Entity,
) -> SimResult<Value> {
    item.insert("event_id".to_string(), id_value(event_id));
    item.insert("worksheet_id".to_string(), id_value(worksheet_id));
    resources::create(store, Resource::WorksheetLineItems, Value::Object(item))
}

/// The body must repeat the line item's id.
pub fn patch_line_item(
    store: &mut WorkdayStore,
    event_id: &str,
    worksheet_id: &str,
    id: &str,
    data: Value,
) -> SimResult<Value> {
    scoped_line_item(store, event_id, worksheet_id, id)?;
    resources::patch(store, Resource::WorksheetLineItems, Lookup::Id(id), data)
}

pub fn delete_line_item(
    store: &mut WorkdayStore,
    event_id: &str,
    worksheet_id: &str,
    id: &str,
) -> SimResult<Value> {
    scoped_line_item(store, event_id, worksheet_id, id)?;
    resources::delete(store, Resource::WorksheetLineItems, Lookup::Id(id))
}

fn rfp_mut<'s>(store: &'s mut WorkdayStore, event: Lookup<'_>) -> SimResult<&'s mut Entity> {
    let found = resources::entity_mut(store, Resource::Events, event)?;
    if !is_rfp(found) {
        return Err(SimError::invalid(format!("Event {event} is not an RFP")));
    }
    Ok(found)
}

/// Invites suppliers (companies or contacts) to an RFP event.
pub fn add_suppliers(
    store: &mut WorkdayStore,
    event: Lookup<'_>,
    relation: Relation,
    ids: &[Value],
) -> SimResult<Value> {
    let found = rfp_mut(store, event)?;
    link(found, relation.field(), ids);
    debug!(%event, field = relation.field(), added = ids.len(), "event suppliers added");
    Ok(Value::Object(found.clone()))
}

pub fn remove_suppliers(
    store: &mut WorkdayStore,
    event: Lookup<'_>,
    relation: Relation,
    ids: &[Value],
) -> SimResult<Value> {
    let found = rfp_mut(store, event)?;
    unlink(found, relation.field(), ids);
    debug!(%event, field = relation.field(), "event suppliers removed");
    Ok(Value::Object(found.clone()))
}

/// Bids of an event. Only RFP events collect bids; others list none.
pub fn bids(
    store: &WorkdayStore,
    event_id: &str,
    filter: &Entity,
    page_size: Option<usize>,
) -> SimResult<Value> {
    let event = resources::get(store, Resource::Events, Lookup::Id(event_id))?;
    if !matches!(&event, Value::Object(event) if is_rfp(event)) {
        return Ok(json!([]));
    }

    let mut scoped = filter.clone();
    scoped.insert("event_id".to_string(), id_value(event_id));
    resources::list(store, Resource::Bids, &scoped, page_size)
}

pub fn bid_line_items(store: &WorkdayStore, bid_id: &str) -> SimResult<Value> {
    Ok(collect(
        store
            .entities(Resource::BidLineItems)
            .filter(|item| belongs_to(item, "bid_id", bid_id)),
    ))
}
