use std::path::Path;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, object, str_field};

use super::{SlackStore, cursor_page, require, split_list};

const SIMULATED_CONTENT: &str = "Simulated file content";

#[derive(Debug, Clone, Default)]
pub struct Upload<'a> {
    /// Comma separated channel ids to share the file into.
    pub channels: Option<&'a str>,
    pub content: Option<&'a str>,
    /// Local path; only its presence matters, the bytes are not read.
    pub file_path: Option<&'a str>,
    pub filename: Option<&'a str>,
    pub filetype: Option<&'a str>,
    pub initial_comment: Option<&'a str>,
    pub thread_ts: Option<&'a str>,
    pub title: Option<&'a str>,
    pub user_id: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct ListFiles<'a> {
    pub channel_id: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub ts_from: Option<&'a str>,
    pub ts_to: Option<&'a str>,
    pub types: Option<&'a str>,
    pub cursor: Option<&'a str>,
    pub limit: Option<usize>,
}

/// `files.upload`. Either `content` or `file_path` is required; a path
/// also needs a `filename`.
pub fn upload(store: &mut SlackStore, params: &Upload<'_>) -> SimResult<Value> {
    let content = params.content.filter(|content| !content.is_empty());
    let file_path = params.file_path.filter(|path| !path.is_empty());
    if content.is_none() && file_path.is_none() {
        return Err(SimError::invalid("missing_content_or_file"));
    }
    if file_path.is_some() && params.filename.is_none_or(str::is_empty) {
        return Err(SimError::invalid("missing_filename"));
    }
    let channels = params.channels.map(split_list).unwrap_or_default();
    if channels.iter().any(|channel| !store.db.has_channel(channel)) {
        return Err(SimError::invalid("invalid_channel"));
    }

    let filename = params.filename.filter(|name| !name.is_empty()).unwrap_or("untitled");
    let content = match file_path {
        Some(_) => SIMULATED_CONTENT,
        None => content.unwrap_or_default(),
    };
    let id = Uuid::new_v4().to_string();
    let file = object(json!({
        "id": id,
        "name": filename,
        "filename": filename,
        "title": params.title.unwrap_or(filename),
        "filetype": params.filetype.map(ToString::to_string).unwrap_or_else(|| filetype_of(filename)),
        "mimetype": mime_guess::from_path(filename).first_or_octet_stream().essence_str(),
        "user_id": params.user_id,
        "created": Utc::now().timestamp(),
        "initial_comment": params.initial_comment,
        "thread_ts": params.thread_ts,
        "content": content,
        "comments": [],
    }));
    let file = store.db.files.insert(file).clone();
    share_into(store, &id, &channels);
    debug!(%id, %filename, channels = channels.len(), "file uploaded");
    Ok(json!({ "file": file }))
}

/// Extension of `filename`, lower-cased; `text` when there is none.
fn filetype_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_else(|| "text".to_string())
}

fn share_into(store: &mut SlackStore, file_id: &str, channels: &[&str]) {
    for channel_id in channels {
        if let Some(channel) = store.db.channel_mut(channel_id) {
            channel.files.insert(file_id.to_string(), true);
        }
    }
}

/// `files.share`. Every channel must exist before anything is shared.
pub fn share(store: &mut SlackStore, file_id: &str, channel_ids: &str) -> SimResult<Value> {
    let file_id = require(Some(file_id), "missing_file_id")?;
    let channel_ids = require(Some(channel_ids), "missing_channel_ids")?;
    if !store.db.files.contains(file_id) {
        return Err(SimError::not_found("file_not_found"));
    }
    let channels = split_list(channel_ids);
    if channels.iter().any(|channel| !store.db.has_channel(channel)) {
        return Err(SimError::invalid("invalid_channel_id"));
    }

    share_into(store, file_id, &channels);
    debug!(%file_id, channels = channels.len(), "file shared");
    Ok(json!({ "file_id": file_id, "shared_to_channels": channels }))
}

/// `files.info` with the file's comments paged by index cursor.
pub fn info(store: &SlackStore, file_id: &str, cursor: Option<&str>, limit: Option<usize>) -> SimResult<Value> {
    let file_id = require(Some(file_id), "missing_file_id")?;
    let file = store
        .db
        .files
        .get(file_id)
        .ok_or_else(|| SimError::not_found("file_not_found"))?;

    let comments = file
        .get("comments")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let page = cursor_page(comments, cursor, limit.unwrap_or(100))?;
    let channels = store
        .db
        .channels
        .iter()
        .filter(|channel| channel.files.contains_key(file_id))
        .map(|channel| channel.id.as_str())
        .collect::<Vec<_>>();

    Ok(json!({
        "file": {
            "id": file_id,
            "name": file.get("filename").or_else(|| file.get("name")),
            "title": file.get("title"),
            "filetype": file.get("filetype"),
            "channels": channels,
            "comments": page.items,
        },
        "response_metadata": { "next_cursor": page.next_page_token },
    }))
}

/// `files.list`. With a channel only the channel's files are listed and
/// the other filters are ignored.
pub fn list(store: &SlackStore, params: &ListFiles<'_>) -> SimResult<Value> {
    let files: Vec<Entity> = match params.channel_id {
        Some(channel_id) => {
            let channel = store.channel(channel_id)?;
            channel
                .files
                .keys()
                .filter_map(|id| store.db.files.get(id))
                .cloned()
                .collect()
        }
        None => {
            let from = params.ts_from.and_then(|ts| ts.parse::<f64>().ok());
            let to = params.ts_to.and_then(|ts| ts.parse::<f64>().ok());
            let types = params.types.map(split_list);
            store
                .db
                .files
                .iter()
                .filter(|file| params.user_id.is_none_or(|user| str_field(file, "user_id") == user))
                .filter(|file| {
                    let created = file.get("created").and_then(Value::as_f64).unwrap_or(0.0);
                    from.is_none_or(|from| created >= from) && to.is_none_or(|to| created <= to)
                })
                .filter(|file| {
                    types
                        .as_ref()
                        .is_none_or(|types| types.iter().any(|kind| *kind == str_field(file, "filetype")))
                })
                .cloned()
                .collect()
        }
    };

    let page = cursor_page(files, params.cursor, params.limit.unwrap_or(100))?;
    Ok(json!({
        "files": page.items,
        "response_metadata": { "next_cursor": page.next_page_token },
    }))
}

pub fn delete(store: &mut SlackStore, file_id: &str) -> SimResult<Value> {
    let file_id = require(Some(file_id), "missing_file_id")?;
    remove(store, file_id)?;
    Ok(json!({}))
}

fn remove(store: &mut SlackStore, file_id: &str) -> SimResult<()> {
    store
        .db
        .files
        .delete(file_id)
        .ok_or_else(|| SimError::not_found("file_not_found"))?;
    for channel in &mut store.db.channels {
        channel.files.remove(file_id);
    }
    debug!(%file_id, "file deleted");
    Ok(())
}

/// `files.remote.add`: registers a file hosted elsewhere.
pub fn add_remote(
    store: &mut SlackStore,
    external_id: &str,
    external_url: &str,
    title: &str,
    filetype: Option<&str>,
    indexable_file_contents: Option<&str>,
) -> SimResult<Value> {
    let external_id = require(Some(external_id), "missing_external_id")?;
    let external_url = require(Some(external_url), "missing_external_url")?;
    let title = require(Some(title), "missing_title")?;

    let id = Uuid::new_v4().to_string();
    store.db.files.insert(object(json!({
        "id": id,
        "external_id": external_id,
        "external_url": external_url,
        "title": title,
        "name": title,
        "filetype": filetype,
        "indexable_file_contents": indexable_file_contents,
        "created": Utc::now().timestamp(),
        "comments": [],
    })));
    debug!(%id, %external_id, "remote file added");
    Ok(json!({ "file_id": id }))
}

/// `files.remote.remove` by file id or, failing that, by external id.
pub fn remove_remote(store: &mut SlackStore, file_id: Option<&str>, external_id: Option<&str>) -> SimResult<Value> {
    let file_id = file_id.filter(|id| !id.is_empty());
    let external_id = external_id.filter(|id| !id.is_empty());

    let target = match (file_id, external_id) {
        (Some(id), _) => id.to_string(),
        (None, Some(external)) => store
            .db
            .files
            .find_by("external_id", &json!(external))
            .map(|file| str_field(file, "id").to_string())
            .ok_or_else(|| SimError::not_found("file_not_found"))?,
        (None, None) => return Err(SimError::invalid("missing_file_id_or_external_id")),
    };
    remove(store, &target)?;
    Ok(json!({}))
}

/// `files.getUploadURLExternal`. Nothing is stored until the upload is completed.
pub fn get_external_upload_url(
    filename: &str,
    length: i64,
    alt_txt: Option<&str>,
    snippet_type: Option<&str>,
) -> SimResult<Value> {
    require(Some(filename), "missing_filename")?;
    if length <= 0 {
        return Err(SimError::invalid("invalid_length"));
    }

    let file_id = Uuid::new_v4().to_string();
    debug!(
        %file_id,
        alt_txt = alt_txt.unwrap_or(""),
        snippet_type = snippet_type.unwrap_or(""),
        "upload url issued"
    );
    Ok(json!({
        "upload_url": format!("https://example.com/upload/{file_id}"),
        "file_id": file_id,
    }))
}

/// `files.completeUploadExternal`. Every file is checked before any of them
/// is updated.
pub fn finish_external_upload(
    store: &mut SlackStore,
    files: &[Value],
    channel_id: Option<&str>,
    initial_comment: Option<&str>,
    thread_ts: Option<&str>,
) -> SimResult<Value> {
    if files.is_empty() {
        return Err(SimError::invalid("missing_files"));
    }
    let channel_id = channel_id.filter(|id| !id.is_empty());
    if channel_id.is_some_and(|id| !store.db.has_channel(id)) {
        return Err(SimError::invalid("invalid_channel"));
    }

    let mut updates = Vec::with_capacity(files.len());
    for file in files {
        let id = file
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SimError::invalid("missing_file_id"))?;
        if !store.db.files.contains(id) {
            return Err(SimError::not_found("file_not_found"));
        }
        updates.push((id, file.get("title").cloned().unwrap_or(Value::Null)));
    }

    for (id, title) in &updates {
        let patch = object(json!({
            "title": title,
            "initial_comment": initial_comment,
            "thread_ts": thread_ts,
        }));
        store.db.files.update(id, &patch);
    }
    if let Some(channel_id) = channel_id {
        let ids = updates.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        if let Some(channel) = store.db.channel_mut(channel_id) {
            for id in ids {
                channel.files.insert(id.to_string(), true);
            }
        }
    }
    debug!(files = updates.len(), "external upload completed");
    Ok(json!({}))
}
