use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::object;

use super::{ChatStore, fresh_name};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Records an uploaded attachment under `parent`.
///
/// Without an explicit `contentType` the type is guessed from `contentName`.
pub fn upload(store: &mut ChatStore, parent: &str, request: Value) -> SimResult<Value> {
    let request = object(request);
    let content_name = request
        .get("contentName")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let content_type = request
        .get("contentType")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .unwrap_or_else(|| guess_content_type(&content_name));

    let attachments = &mut store.db.attachments;
    let name = fresh_name(attachments, |n| format!("{parent}/attachments/{n}"));
    let attachment = object(json!({
        "name": name,
        "contentName": content_name,
        "contentType": content_type,
        "attachmentDataRef": {},
        "driveDataRef": {},
        "thumbnailUri": "",
        "downloadUri": "",
        "source": "UPLOADED_CONTENT",
    }));

    debug!(%name, "attachment uploaded");
    Ok(Value::Object(attachments.insert(attachment).clone()))
}

pub fn download(_store: &ChatStore, resource_name: &str) -> SimResult<Value> {
    Err(SimError::unsupported(format!("media download of {resource_name}")))
}

fn guess_content_type(content_name: &str) -> String {
    mime_guess::from_path(content_name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_type_from_extension() {
        assert_eq!(guess_content_type("agenda.pdf"), "application/pdf");
        assert_eq!(guess_content_type("unknown"), FALLBACK_CONTENT_TYPE);
    }
}
