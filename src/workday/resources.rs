use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, id_string, same_id};

use super::{WorkdayStore, id_value};

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Attachments,
    Awards,
    AwardLineItems,
    Contracts,
    ContractTypes,
    EventTemplates,
    Events,
    Worksheets,
    WorksheetLineItems,
    Bids,
    BidLineItems,
    Fields,
    FieldGroups,
    PaymentTerms,
    PaymentTypes,
    PaymentCurrencies,
    Projects,
    ProjectTypes,
    SpendCategories,
    SupplierCompanies,
    SupplierContacts,
    ContactTypes,
    SupplierCompanySegmentations,
}

/// How a patch body may refer to the entity it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyId {
    /// Any identifier in the body is ignored.
    Free,
    /// The body must repeat the id (or external id) used in the URL.
    MustMatch,
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub external_ids: bool,
    pub body_id: BodyId,
    /// Field values set on create unless the body provides them.
    pub defaults: &'static [(&'static str, &'static str)],
}

const fn spec(name: &'static str, label: &'static str) -> ResourceSpec {
    ResourceSpec {
        name,
        label,
        external_ids: false,
        body_id: BodyId::Free,
        defaults: &[],
    }
}

const fn external(name: &'static str, label: &'static str, body_id: BodyId) -> ResourceSpec {
    ResourceSpec {
        name,
        label,
        external_ids: true,
        body_id,
        defaults: &[],
    }
}

impl Resource {
    pub const ALL: [Resource; 23] = [
        Self::Attachments,
        Self::Awards,
        Self::AwardLineItems,
        Self::Contracts,
        Self::ContractTypes,
        Self::EventTemplates,
        Self::Events,
        Self::Worksheets,
        Self::WorksheetLineItems,
        Self::Bids,
        Self::BidLineItems,
        Self::Fields,
        Self::FieldGroups,
        Self::PaymentTerms,
        Self::PaymentTypes,
        Self::PaymentCurrencies,
        Self::Projects,
        Self::ProjectTypes,
        Self::SpendCategories,
        Self::SupplierCompanies,
        Self::SupplierContacts,
        Self::ContactTypes,
        Self::SupplierCompanySegmentations,
    ];

    pub const fn spec(self) -> ResourceSpec {
        use BodyId::{Free, MustMatch};

        match self {
            Self::Attachments => external("attachments", "Attachment", Free),
            Self::Awards => spec("awards", "Award"),
            Self::AwardLineItems => spec("award_line_items", "Award line item"),
            Self::Contracts => external("contracts", "Contract", MustMatch),
            Self::ContractTypes => external("contract_types", "Contract type", MustMatch),
            Self::EventTemplates => spec("event_templates", "Event template"),
            Self::Events => ResourceSpec {
                defaults: &[("duplication_state", "scheduled")],
                ..external("events", "Event", MustMatch)
            },
            Self::Worksheets => spec("worksheets", "Worksheet"),
            Self::WorksheetLineItems => ResourceSpec {
                body_id: MustMatch,
                ..spec("worksheet_line_items", "Line item")
            },
            Self::Bids => spec("bids", "Bid"),
            Self::BidLineItems => spec("bid_line_items", "Bid line item"),
            Self::Fields => spec("fields", "Field"),
            Self::FieldGroups => spec("field_groups", "Field group"),
            Self::PaymentTerms => external("payment_terms", "Payment term", Free),
            Self::PaymentTypes => external("payment_types", "Payment type", Free),
            Self::PaymentCurrencies => external("payment_currencies", "Payment currency", Free),
            Self::Projects => external("projects", "Project", MustMatch),
            Self::ProjectTypes => spec("project_types", "Project type"),
            Self::SpendCategories => external("spend_categories", "Spend category", Free),
            Self::SupplierCompanies => external("supplier_companies", "Company", Free),
            Self::SupplierContacts => external("supplier_contacts", "Contact", MustMatch),
            Self::ContactTypes => external("contact_types", "Contact type", MustMatch),
            Self::SupplierCompanySegmentations => {
                spec("supplier_company_segmentations", "Segmentation")
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = SimError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|resource| resource.as_str() == name)
            .ok_or_else(|| SimError::unsupported(format!("unknown resource {name}")))
    }
}

/// How a URL addresses one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Id(&'a str),
    ExternalId(&'a str),
}

impl fmt::Display for Lookup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::ExternalId(external_id) => write!(f, "with external_id {external_id}"),
        }
    }
}

/// True when every filter field equals the entity's value.
pub(crate) fn matches(entity: &Entity, filter: &Entity) -> bool {
    filter
        .iter()
        .all(|(field, wanted)| entity.get(field).is_some_and(|found| same_id(found, wanted)))
}

/// Key of the entity `lookup` addresses.
pub(crate) fn locate(store: &WorkdayStore, resource: Resource, lookup: Lookup<'_>) -> SimResult<String> {
    let spec = resource.spec();
    let missing = || SimError::not_found(format!("{} {lookup} not found", spec.label));
    let collection = store.collection(resource).ok_or_else(missing)?;

    let entity = match lookup {
        Lookup::Id(id) => collection.get(id),
        Lookup::ExternalId(external_id) => {
            if !spec.external_ids {
                return Err(SimError::unsupported(format!(
                    "{} has no external ids",
                    spec.name
                )));
            }
            collection.find_by("external_id", &json!(external_id))
        }
    };
    entity
        .and_then(|entity| entity.get(collection.key()))
        .and_then(id_string)
        .ok_or_else(missing)
}

/// The entity `lookup` addresses, for in-place edits.
pub(crate) fn entity_mut<'s>(
    store: &'s mut WorkdayStore,
    resource: Resource,
    lookup: Lookup<'_>,
) -> SimResult<&'s mut Entity> {
    let id = locate(store, resource, lookup)?;
    store
        .collection_mut(resource)
        .get_mut(&id)
        .ok_or_else(|| SimError::not_found(format!("{} {id} not found", resource.spec().label)))
}

/// Entities matching `filter`, at most `page_size` of them (default 50).
pub fn list(
    store: &WorkdayStore,
    resource: Resource,
    filter: &Entity,
    page_size: Option<usize>,
) -> SimResult<Value> {
    let size = page_size.filter(|size| *size > 0).unwrap_or(DEFAULT_PAGE_SIZE);
    let found = store
        .entities(resource)
        .filter(|entity| matches(entity, filter))
        .take(size)
        .cloned()
        .map(Value::Object)
        .collect::<Vec<_>>();
    Ok(Value::Array(found))
}

/// Rejects an `external_id` already held by an entity other than `owner`.
fn ensure_unique_external_id(
    store: &WorkdayStore,
    resource: Resource,
    entity: &Entity,
    owner: Option<&str>,
) -> SimResult<()> {
    let spec = resource.spec();
    if !spec.external_ids {
        return Ok(());
    }
    let Some(external_id) = entity.get("external_id").filter(|value| !value.is_null()) else {
        return Ok(());
    };
    let taken = store.entities(resource).any(|existing| {
        existing.get("external_id") == Some(external_id)
            && existing.get("id").and_then(id_string).as_deref() != owner
    });
    if taken {
        return Err(SimError::invalid(format!(
            "{} with this external_id already exists.",
            spec.label
        )));
    }
    Ok(())
}

/// Stores `body` under the next id. Ids in the body are ignored.
pub fn create(store: &mut WorkdayStore, resource: Resource, body: Value) -> SimResult<Value> {
    let spec = resource.spec();
    let mut entity = super::body(body)?;
    entity.remove("id");
    for (field, value) in spec.defaults {
        entity.entry(field.to_string()).or_insert_with(|| json!(value));
    }

    ensure_unique_external_id(store, resource, &entity, None)?;

    let created = store.collection_mut(resource).create(entity).clone();
    debug!(%resource, id = ?created.get("id"), "created");
    Ok(Value::Object(created))
}

pub fn get(store: &WorkdayStore, resource: Resource, lookup: Lookup<'_>) -> SimResult<Value> {
    let id = locate(store, resource, lookup)?;
    store
        .collection(resource)
        .and_then(|collection| collection.get(&id))
        .cloned()
        .map(Value::Object)
        .ok_or_else(|| SimError::not_found(format!("{} {id} not found", resource.spec().label)))
}

/// Shallow-merges `body` into the entity. The id never changes.
pub fn patch(
    store: &mut WorkdayStore,
    resource: Resource,
    lookup: Lookup<'_>,
    body: Value,
) -> SimResult<Value> {
    let spec = resource.spec();
    let id = locate(store, resource, lookup)?;
    let changes = super::body(body)?;

    if spec.body_id == BodyId::MustMatch {
        let consistent = match lookup {
            Lookup::Id(url_id) => changes
                .get("id")
                .is_some_and(|found| same_id(found, &id_value(url_id))),
            Lookup::ExternalId(url_id) => changes.get("external_id") == Some(&json!(url_id)),
        };
        if !consistent {
            return Err(SimError::invalid(match lookup {
                Lookup::Id(_) => "Id in body must match url",
                Lookup::ExternalId(_) => "External id in body must match url",
            }));
        }
    }

    ensure_unique_external_id(store, resource, &changes, Some(&id))?;

    let updated = store
        .collection_mut(resource)
        .update(&id, &changes)
        .cloned()
        .ok_or_else(|| SimError::not_found(format!("{} {id} not found", spec.label)))?;
    debug!(%resource, %id, "patched");
    Ok(Value::Object(updated))
}

/// Removes the entity. Succeeds with no payload.
pub fn delete(store: &mut WorkdayStore, resource: Resource, lookup: Lookup<'_>) -> SimResult<Value> {
    let id = locate(store, resource, lookup)?;
    store.collection_mut(resource).delete(&id);
    debug!(%resource, %id, "deleted");
    Ok(Value::Null)
}

/// Field names of the first stored entity.
pub fn describe(store: &WorkdayStore, resource: Resource) -> SimResult<Value> {
    let fields = store
        .entities(resource)
        .next()
        .map(|entity| entity.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    Ok(json!(fields))
}

/// Supplier links kept on events and projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    SupplierCompanies,
    SupplierContacts,
}

impl Relation {
    pub fn field(self) -> &'static str {
        match self {
            Self::SupplierCompanies => "supplier_companies",
            Self::SupplierContacts => "supplier_contacts",
        }
    }
}

/// Appends `ids` to the list in `field`, creating it when absent.
pub(crate) fn link(entity: &mut Entity, field: &str, ids: &[Value]) {
    let list = entity.entry(field.to_string()).or_insert_with(|| json!([]));
    if !list.is_array() {
        *list = json!([]);
    }
    if let Value::Array(items) = list {
        items.extend(ids.iter().cloned());
    }
}

/// Drops `ids` from the list in `field`.
pub(crate) fn unlink(entity: &mut Entity, field: &str, ids: &[Value]) {
    if let Some(Value::Array(items)) = entity.get_mut(field) {
        items.retain(|item| !ids.iter().any(|id| same_id(item, id)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{VendorStore, object};

    #[test]
    fn resource_names_round_trip() {
        for resource in Resource::ALL {
            assert_eq!(resource.as_str().parse::<Resource>(), Ok(resource));
        }
        assert!("nothing".parse::<Resource>().is_err());
    }

    #[test]
    fn filters_compare_every_field() {
        let entity = object(json!({ "id": 3, "state": "active", "type": "RFP" }));
        assert!(matches(&entity, &object(json!({ "state": "active" }))));
        assert!(matches(&entity, &object(json!({ "id": "3", "type": "RFP" }))));
        assert!(!matches(&entity, &object(json!({ "state": "draft" }))));
        assert!(!matches(&entity, &object(json!({ "owner": "x" }))));
    }

    #[test]
    fn lookups_by_external_id_need_support() {
        let mut store = WorkdayStore::init();
        create(&mut store, Resource::Awards, json!({ "name": "a", "external_id": "A" })).expect("create");
        match get(&store, Resource::Awards, Lookup::ExternalId("A")) {
            Err(SimError::Unsupported(_)) => {}
            other => panic!("expected unsupported, got {other:?}"),
        }
    }

    #[test]
    fn link_and_unlink_keep_other_ids() {
        let mut entity = Entity::new();
        link(&mut entity, "suppliers", &[json!(1), json!(2), json!(3)]);
        unlink(&mut entity, "suppliers", &[json!("2")]);
        assert_eq!(entity["suppliers"], json!([1, 3]));
    }
}
