use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Entity = Map<String, Value>;

const DEFAULT_KEY: &str = "id";

fn default_key() -> String {
    DEFAULT_KEY.to_string()
}

/// Ordered set of JSON entities addressed by one key field.
///
/// Insertion order is preserved so list endpoints return entities in the
/// order they were created. The counter only moves forward, which keeps
/// generated ids unique after deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default = "default_key")]
    key: String,
    #[serde(default)]
    counter: u64,
    #[serde(default)]
    items: Vec<Entity>,
}

impl Default for Collection {
    fn default() -> Self {
        Self::keyed(DEFAULT_KEY)
    }
}

impl Collection {
    pub fn keyed(key: &str) -> Self {
        Self {
            key: key.to_string(),
            counter: 0,
            items: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn next_id(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    /// Stores `attrs`, assigning the next counter value as key when absent.
    pub fn create(&mut self, mut attrs: Entity) -> &Entity {
        if !attrs.contains_key(&self.key) {
            let id = self.next_id();
            attrs.insert(self.key.clone(), Value::from(id));
        }
        self.insert(attrs)
    }

    /// Stores `entity`, replacing any entry with the same key in place.
    pub fn insert(&mut self, entity: Entity) -> &Entity {
        let id = entity.get(&self.key).and_then(id_string);
        if let Some(numeric) = id.as_deref().and_then(|id| id.parse::<u64>().ok()) {
            self.counter = self.counter.max(numeric);
        }

        match id.and_then(|id| self.position(&id)) {
            Some(index) => {
                self.items[index] = entity;
                &self.items[index]
            }
            None => {
                let index = self.items.len();
                self.items.push(entity);
                &self.items[index]
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.position(id).map(|index| &self.items[index])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.position(id).map(move |index| &mut self.items[index])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Shallow-merges `patch` into the entity. The key field is never rewritten.
    pub fn update(&mut self, id: &str, patch: &Entity) -> Option<&Entity> {
        let key = self.key.clone();
        let entity = self.get_mut(id)?;
        for (field, value) in patch {
            if *field == key {
                continue;
            }
            entity.insert(field.clone(), value.clone());
        }
        Some(entity)
    }

    pub fn delete(&mut self, id: &str) -> Option<Entity> {
        self.position(id).map(|index| self.items.remove(index))
    }

    pub fn find_by(&self, field: &str, value: &Value) -> Option<&Entity> {
        self.items
            .iter()
            .find(|entity| entity.get(field).is_some_and(|found| same_id(found, value)))
    }

    pub fn find_by_mut(&mut self, field: &str, value: &Value) -> Option<&mut Entity> {
        self.items
            .iter_mut()
            .find(|entity| entity.get(field).is_some_and(|found| same_id(found, value)))
    }

    pub fn list(&self) -> Vec<Entity> {
        self.items.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.items.iter_mut()
    }

    pub fn first(&self) -> Option<&Entity> {
        self.items.first()
    }

    pub fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&Entity) -> bool,
    {
        let before = self.items.len();
        self.items.retain(keep);
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|entity| {
            entity
                .get(&self.key)
                .and_then(id_string)
                .is_some_and(|found| found == id)
        })
    }
}

/// String form of an id that may be stored as a JSON string or number.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub fn same_id(left: &Value, right: &Value) -> bool {
    match (id_string(left), id_string(right)) {
        (Some(left), Some(right)) => left == right,
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn assigns_counter_ids_when_key_missing() {
        let mut items = Collection::default();
        items.create(entity(json!({ "name": "a" })));
        items.create(entity(json!({ "name": "b" })));

        assert_eq!(items.get("2").and_then(|e| e.get("name")), Some(&json!("b")));
    }

    #[test]
    fn counter_never_reuses_deleted_ids() {
        let mut items = Collection::default();
        items.create(Entity::new());
        items.create(Entity::new());
        items.delete("2").expect("second entity");

        let created = items.create(Entity::new());
        assert_eq!(created.get("id"), Some(&json!(3)));
    }

    #[test]
    fn explicit_numeric_ids_advance_counter() {
        let mut items = Collection::default();
        items.insert(entity(json!({ "id": 10 })));

        assert_eq!(items.next_id(), 11);
    }

    #[test]
    fn update_merges_without_touching_key() {
        let mut items = Collection::keyed("name");
        items.insert(entity(json!({ "name": "spaces/A", "displayName": "A" })));

        let updated = items
            .update(
                "spaces/A",
                &entity(json!({ "name": "spaces/B", "displayName": "B" })),
            )
            .expect("entity exists");

        assert_eq!(updated.get("name"), Some(&json!("spaces/A")));
        assert_eq!(updated.get("displayName"), Some(&json!("B")));
    }

    #[test]
    fn missing_ids_leave_collection_unchanged() {
        let mut items = Collection::default();
        items.create(entity(json!({ "name": "a" })));
        let before = items.clone();

        assert!(items.update("9", &Entity::new()).is_none());
        assert!(items.delete("9").is_none());
        assert_eq!(items, before);
    }

    #[test]
    fn find_by_compares_string_and_numeric_ids() {
        let mut items = Collection::default();
        items.create(entity(json!({ "event_id": 4 })));

        assert!(items.find_by("event_id", &json!("4")).is_some());
    }
}
