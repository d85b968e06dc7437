pub mod collection;
pub mod page;
pub mod persist;

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::AppResult;

pub use collection::{Collection, Entity, id_string, same_id};
pub use page::{Page, paginate, parse_token};
pub use persist::MissingFile;

/// Lifecycle shared by every vendor simulation.
///
/// A store is an explicit value owned by the caller; nothing is global.
pub trait VendorStore: Sized {
    type Db: Serialize + DeserializeOwned + Default;

    const VENDOR: &'static str;
    const MISSING_FILE: MissingFile;

    fn from_db(db: Self::Db) -> Self;
    fn db(&self) -> &Self::Db;
    fn db_mut(&mut self) -> &mut Self::Db;

    fn seeded() -> Self::Db {
        Self::Db::default()
    }

    fn init() -> Self {
        info!(vendor = Self::VENDOR, "store initialized");
        Self::from_db(Self::seeded())
    }

    fn reset(&mut self) {
        info!(vendor = Self::VENDOR, "store reset");
        *self.db_mut() = Self::seeded();
    }

    fn dispose(self) {
        info!(vendor = Self::VENDOR, "store disposed");
    }

    fn save(&self, path: &Path) -> AppResult<()> {
        persist::save_json(path, self.db())?;
        info!(vendor = Self::VENDOR, path = %path.display(), "state saved");
        Ok(())
    }

    /// Replaces the whole store with the file's content.
    fn load(&mut self, path: &Path) -> AppResult<()> {
        match persist::load_json(path, Self::MISSING_FILE)? {
            Some(db) => {
                *self.db_mut() = db;
                info!(vendor = Self::VENDOR, path = %path.display(), "state loaded");
            }
            None => debug!(vendor = Self::VENDOR, path = %path.display(), "no state file, keeping store"),
        }
        Ok(())
    }

    fn open(path: &Path) -> AppResult<Self> {
        let mut store = Self::init();
        store.load(path)?;
        Ok(store)
    }

    fn snapshot(&self) -> AppResult<Value> {
        Ok(serde_json::to_value(self.db())?)
    }
}

/// Object view of a request body. Anything that is not an object is empty.
pub fn object(value: Value) -> Entity {
    match value {
        Value::Object(map) => map,
        _ => Entity::new(),
    }
}

pub fn str_field<'a>(entity: &'a Entity, field: &str) -> &'a str {
    entity.get(field).and_then(Value::as_str).unwrap_or("")
}

pub fn bool_field(entity: &Entity, field: &str) -> bool {
    entity.get(field).and_then(Value::as_bool).unwrap_or(false)
}
