pub mod init;
pub mod reset;
pub mod search;
pub mod show;

use std::path::Path;

use serde_json::Value;

use crate::chat::ChatStore;
use crate::cli::Vendor;
use crate::error::AppResult;
use crate::gmail::GmailStore;
use crate::reddit::RedditStore;
use crate::slack::SlackStore;
use crate::store::VendorStore;
use crate::workday::WorkdayStore;

fn seed_with<S: VendorStore>(path: &Path) -> AppResult<()> {
    let store = S::init();
    store.save(path)?;
    store.dispose();
    Ok(())
}

fn reset_with<S: VendorStore>(path: &Path) -> AppResult<()> {
    let mut store = S::open(path)?;
    store.reset();
    store.save(path)?;
    store.dispose();
    Ok(())
}

fn snapshot_with<S: VendorStore>(path: &Path) -> AppResult<Value> {
    S::open(path)?.snapshot()
}

/// Writes the vendor's seeded store to `path`.
pub(crate) fn seed(vendor: Vendor, path: &Path) -> AppResult<()> {
    match vendor {
        Vendor::Gmail => seed_with::<GmailStore>(path),
        Vendor::Chat => seed_with::<ChatStore>(path),
        Vendor::Reddit => seed_with::<RedditStore>(path),
        Vendor::Slack => seed_with::<SlackStore>(path),
        Vendor::Workday => seed_with::<WorkdayStore>(path),
    }
}

/// Loads the state at `path` under the vendor's missing-file policy,
/// resets it and saves it back.
pub(crate) fn reset_file(vendor: Vendor, path: &Path) -> AppResult<()> {
    match vendor {
        Vendor::Gmail => reset_with::<GmailStore>(path),
        Vendor::Chat => reset_with::<ChatStore>(path),
        Vendor::Reddit => reset_with::<RedditStore>(path),
        Vendor::Slack => reset_with::<SlackStore>(path),
        Vendor::Workday => reset_with::<WorkdayStore>(path),
    }
}

pub(crate) fn snapshot(vendor: Vendor, path: &Path) -> AppResult<Value> {
    match vendor {
        Vendor::Gmail => snapshot_with::<GmailStore>(path),
        Vendor::Chat => snapshot_with::<ChatStore>(path),
        Vendor::Reddit => snapshot_with::<RedditStore>(path),
        Vendor::Slack => snapshot_with::<SlackStore>(path),
        Vendor::Workday => snapshot_with::<WorkdayStore>(path),
    }
}
