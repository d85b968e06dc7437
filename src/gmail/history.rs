use serde_json::{Value, json};

use crate::error::SimResult;
use crate::store::{paginate, parse_token};

use super::GmailStore;

/// Lists history records newer than `start_history_id`.
pub fn list(
    store: &GmailStore,
    user_id: &str,
    start_history_id: Option<&str>,
    max_results: usize,
    page_token: Option<&str>,
) -> SimResult<Value> {
    let mailbox = store.mailbox(user_id)?;
    let start = start_history_id
        .and_then(|id| id.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let records = mailbox
        .history
        .iter()
        .filter(|record| {
            record
                .get("id")
                .and_then(Value::as_str)
                .and_then(|id| id.parse::<u64>().ok())
                .is_some_and(|id| id > start)
        })
        .cloned()
        .collect::<Vec<_>>();

    let page = paginate(records, parse_token(page_token)?, max_results);
    Ok(json!({
        "history": page.items,
        "nextPageToken": page.next_page_token,
        "historyId": mailbox.history_id(),
    }))
}
