use serde_json::Value;

use crate::error::SimResult;
use crate::store::{Entity, same_id};

use super::WorkdayStore;
use super::resources::{Lookup, Resource, locate, matches};

/// Contacts of a company, addressed by id or external id, narrowed by an
/// equality filter.
pub fn contacts(store: &WorkdayStore, company: Lookup<'_>, filter: &Entity) -> SimResult<Value> {
    let company_id = Value::from(locate(store, Resource::SupplierCompanies, company)?);
    let found = store
        .entities(Resource::SupplierContacts)
        .filter(|contact| {
            contact
                .get("company_id")
                .is_some_and(|found| same_id(found, &company_id))
                && matches(contact, filter)
        })
        .cloned()
        .map(Value::Object)
        .collect();
    Ok(Value::Array(found))
}
