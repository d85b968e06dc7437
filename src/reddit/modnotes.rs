use serde_json::{Value, json};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::str_field;

use super::RedditStore;

/// `GET /api/mod/notes/recent`: the user's notes, narrowed to `subreddit`
/// when a note records one.
pub fn recent(store: &RedditStore, user: &str, subreddit: &str) -> SimResult<Value> {
    let notes = store
        .db
        .modnotes
        .get(user)
        .into_iter()
        .flatten()
        .filter(|note| match note.get("subreddit").and_then(Value::as_str) {
            Some(recorded) => recorded.eq_ignore_ascii_case(subreddit),
            None => true,
        })
        .collect::<Vec<_>>();
    Ok(json!({ "user": user, "subreddit": subreddit, "notes": notes }))
}

/// `DELETE /api/mod/notes`.
pub fn delete(store: &mut RedditStore, user: &str, note_id: &str) -> SimResult<Value> {
    let notes = store
        .db
        .modnotes
        .get_mut(user)
        .ok_or_else(|| SimError::not_found("note_not_found"))?;
    let index = notes
        .iter()
        .position(|note| str_field(note, "id") == note_id)
        .ok_or_else(|| SimError::not_found("note_not_found"))?;
    notes.remove(index);
    debug!(%user, %note_id, "mod note deleted");
    Ok(json!({ "status": "note_deleted", "note_id": note_id }))
}
