use serde_json::Value;

use crate::error::{SimError, SimResult};

use super::ChatStore;

pub fn get(_store: &ChatStore, name: &str) -> SimResult<Value> {
    Err(SimError::unsupported(format!("space event {name}")))
}

pub fn list(
    _store: &ChatStore,
    parent: &str,
    _page_size: Option<usize>,
    _page_token: Option<&str>,
    _filter: &str,
) -> SimResult<Value> {
    Err(SimError::unsupported(format!("space events of {parent}")))
}
