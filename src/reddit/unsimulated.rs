//! Endpoints that have no state behind them.
//!
//! They used to answer with fixed sample payloads; here they fail with
//! `Unsupported` so callers notice they are not modelled.

use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Account,
    Emoji,
    Flair,
    LinksAndComments,
    Listings,
    Live,
    Messages,
    Misc,
    Moderation,
    Modmail,
    Modnotes,
    Multis,
    Search,
    Subreddits,
    UploadLeases,
    Users,
    Widgets,
    Wiki,
}

impl Area {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Emoji => "emoji",
            Self::Flair => "flair",
            Self::LinksAndComments => "links_and_comments",
            Self::Listings => "listings",
            Self::Live => "live",
            Self::Messages => "messages",
            Self::Misc => "misc",
            Self::Moderation => "moderation",
            Self::Modmail => "modmail",
            Self::Modnotes => "modnotes",
            Self::Multis => "multis",
            Self::Search => "search",
            Self::Subreddits => "subreddits",
            Self::UploadLeases => "upload_leases",
            Self::Users => "users",
            Self::Widgets => "widgets",
            Self::Wiki => "wiki",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejects a call to `endpoint` (e.g. `GET /hot`) in `area`.
pub fn call(area: Area, endpoint: &str) -> SimResult<Value> {
    warn!(%area, %endpoint, "endpoint is not simulated");
    Err(SimError::unsupported(format!("{area} endpoint {endpoint} is not simulated")))
}
