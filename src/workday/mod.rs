//! Workday Strategic Sourcing resources.
//!
//! Plain CRUD resources share one set of operations in [`resources`],
//! driven by the [`Resource`] table. The remaining modules add the
//! endpoints that go beyond CRUD: scoped worksheets, relationships,
//! reports and the SCIM user directory.

pub mod attachments;
pub mod awards;
pub mod events;
pub mod fields;
pub mod projects;
pub mod reports;
pub mod resources;
pub mod scim;
pub mod supplier_companies;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::error::{SimError, SimResult};
use crate::store::{Collection, Entity, MissingFile, VendorStore};

pub use resources::{Lookup, Relation, Resource, ResourceSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkdayDb {
    #[serde(default)]
    pub collections: BTreeMap<Resource, Collection>,
    /// Options per field, keyed by the field id.
    #[serde(default = "field_options")]
    pub field_options: Collection,
    /// Report name (`savings_reports_entries`, ...) to its payload.
    #[serde(default)]
    pub reports: BTreeMap<String, Value>,
    #[serde(default)]
    pub scim: Scim,
}

fn field_options() -> Collection {
    Collection::keyed("field_id")
}

impl Default for WorkdayDb {
    fn default() -> Self {
        Self {
            collections: Resource::ALL
                .iter()
                .map(|resource| (*resource, Collection::default()))
                .collect(),
            field_options: field_options(),
            reports: BTreeMap::new(),
            scim: Scim::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scim {
    #[serde(default)]
    pub users: Collection,
    #[serde(default)]
    pub schemas: Vec<Entity>,
    #[serde(default)]
    pub resource_types: Vec<Entity>,
    #[serde(default)]
    pub service_provider_config: Entity,
}

#[derive(Debug, Clone, Default)]
pub struct WorkdayStore {
    db: WorkdayDb,
}

impl WorkdayStore {
    /// Entities of `resource` in creation order.
    pub fn entities(&self, resource: Resource) -> impl Iterator<Item = &Entity> {
        self.db
            .collections
            .get(&resource)
            .into_iter()
            .flat_map(Collection::iter)
    }

    pub(crate) fn collection(&self, resource: Resource) -> Option<&Collection> {
        self.db.collections.get(&resource)
    }

    /// The resource's collection, created empty if a loaded file lacked it.
    pub(crate) fn collection_mut(&mut self, resource: Resource) -> &mut Collection {
        self.db.collections.entry(resource).or_default()
    }
}

impl VendorStore for WorkdayStore {
    type Db = WorkdayDb;

    const VENDOR: &'static str = "workday";
    const MISSING_FILE: MissingFile = MissingFile::Ignore;

    fn from_db(db: WorkdayDb) -> Self {
        Self { db }
    }

    fn db(&self) -> &WorkdayDb {
        &self.db
    }

    fn db_mut(&mut self) -> &mut WorkdayDb {
        &mut self.db
    }
}

/// HTTP status and body for an operation's outcome.
///
/// `success` is the status of a successful call (200, or 201 for creates).
/// A successful call without a payload answers 204.
pub fn respond(result: SimResult<Value>, success: u16) -> (Value, u16) {
    match result {
        Ok(Value::Null) => (json!({}), 204),
        Ok(body) => (body, success),
        Err(err) => {
            let status = match &err {
                SimError::NotFound(_) => 404,
                SimError::Validation(_) => 400,
                SimError::Unsupported(_) => 501,
            };
            warn!(status, error = %err, "workday request failed");
            (json!({ "error": err.message() }), status)
        }
    }
}

/// JSON form of an id taken from a URL: numeric ids stay numbers.
pub(crate) fn id_value(id: &str) -> Value {
    match id.parse::<u64>() {
        Ok(number) => json!(number),
        Err(_) => json!(id),
    }
}

/// Request body as an object. Absent or empty bodies are rejected.
pub(crate) fn body(value: Value) -> SimResult<Entity> {
    match value {
        Value::Object(fields) if !fields.is_empty() => Ok(fields),
        _ => Err(SimError::invalid("Body is required")),
    }
}
