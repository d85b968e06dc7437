use serde_json::{Value, json};
use tracing::debug;

use crate::chat::ChatStore;
use crate::chat::spaces::{self, SearchSpaces};
use crate::cli::{SearchArgs, Vendor};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::gmail::{GmailStore, ListParams, messages};
use crate::slack::{SlackStore, search};
use crate::store::{VendorStore, str_field};

pub fn run(ctx: &AppContext, args: SearchArgs) -> AppResult<()> {
    if args.limit == 0 {
        return Err(AppError::InvalidInput(
            "--limit must be greater than 0".to_string(),
        ));
    }

    let path = ctx.state_file(args.vendor);
    let hits = match args.vendor {
        Vendor::Gmail => {
            let store = GmailStore::open(&path)?;
            let params = ListParams {
                q: args.query.clone(),
                max_results: args.limit,
                ..ListParams::default()
            };
            messages::list(&store, ctx.settings.gmail_user(), &params)?
        }
        Vendor::Chat => {
            let mut store = ChatStore::open(&path)?;
            store.set_current_user(ctx.settings.chat_user());
            let params = SearchSpaces {
                use_admin_access: true,
                query: &args.query,
                page_size: Some(args.limit),
                ..SearchSpaces::default()
            };
            spaces::search(&store, &params)?
        }
        Vendor::Slack => {
            let store = SlackStore::open(&path)?;
            let mut found = search::all(&store, &args.query)?;
            truncate(&mut found, "messages", args.limit);
            truncate(&mut found, "files", args.limit);
            found
        }
        Vendor::Reddit | Vendor::Workday => {
            return Err(AppError::InvalidInput(format!(
                "search is not available for {}",
                args.vendor
            )));
        }
    };
    debug!(vendor = %args.vendor, query = %args.query, "search finished");

    let lines = describe(args.vendor, &hits);
    let text = if lines.is_empty() {
        vec!["0 results".to_string()]
    } else {
        lines
    };
    ctx.output
        .emit_lines(&text, &json!({ "vendor": args.vendor.as_str(), "results": hits }))
}

fn truncate(found: &mut Value, key: &str, limit: usize) {
    if let Some(Value::Array(items)) = found.get_mut(key) {
        items.truncate(limit);
    }
}

fn items<'a>(hits: &'a Value, key: &str) -> impl Iterator<Item = &'a serde_json::Map<String, Value>> {
    hits.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// One line per hit, shaped for the vendor.
fn describe(vendor: Vendor, hits: &Value) -> Vec<String> {
    match vendor {
        Vendor::Gmail => items(hits, "messages")
            .map(|message| format!("{}  {}", str_field(message, "id"), str_field(message, "snippet")))
            .collect(),
        Vendor::Chat => items(hits, "spaces")
            .map(|space| format!("{}  {}", str_field(space, "name"), str_field(space, "displayName")))
            .collect(),
        Vendor::Slack => items(hits, "messages")
            .map(|message| format!("message {}  {}", str_field(message, "ts"), str_field(message, "text")))
            .chain(
                items(hits, "files")
                    .map(|file| format!("file {}  {}", str_field(file, "id"), str_field(file, "name"))),
            )
            .collect(),
        Vendor::Reddit | Vendor::Workday => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slack_lines_list_messages_before_files() {
        let hits = json!({
            "messages": [{ "ts": "1.000001", "text": "ship it" }],
            "files": [{ "id": "F1", "name": "plan.pdf" }],
        });
        assert_eq!(
            describe(Vendor::Slack, &hits),
            vec!["message 1.000001  ship it", "file F1  plan.pdf"]
        );
    }

    #[test]
    fn truncation_only_touches_lists() {
        let mut found = json!({ "messages": [1, 2, 3], "total": 3 });
        truncate(&mut found, "messages", 2);
        truncate(&mut found, "total", 1);
        assert_eq!(found, json!({ "messages": [1, 2], "total": 3 }));
    }
}
