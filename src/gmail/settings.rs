use std::str::FromStr;

use serde_json::Value;
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::store::{Entity, object};

use super::{GmailStore, MailSettings};

/// Single-object settings resources that only support get and update.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Category {
    Imap,
    Pop,
    Vacation,
    Language,
    AutoForwarding,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::Imap,
        Self::Pop,
        Self::Vacation,
        Self::Language,
        Self::AutoForwarding,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Imap => "imap",
            Self::Pop => "pop",
            Self::Vacation => "vacation",
            Self::Language => "language",
            Self::AutoForwarding => "autoForwarding",
        }
    }

    fn slot(self, settings: &MailSettings) -> &Entity {
        match self {
            Self::Imap => &settings.imap,
            Self::Pop => &settings.pop,
            Self::Vacation => &settings.vacation,
            Self::Language => &settings.language,
            Self::AutoForwarding => &settings.auto_forwarding,
        }
    }

    fn slot_mut(self, settings: &mut MailSettings) -> &mut Entity {
        match self {
            Self::Imap => &mut settings.imap,
            Self::Pop => &mut settings.pop,
            Self::Vacation => &mut settings.vacation,
            Self::Language => &mut settings.language,
            Self::AutoForwarding => &mut settings.auto_forwarding,
        }
    }
}

impl FromStr for Category {
    type Err = SimError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| SimError::invalid(format!("unknown settings category: {value}")))
    }
}

pub fn get(store: &GmailStore, user_id: &str, category: Category) -> SimResult<Value> {
    let settings = &store.mailbox(user_id)?.settings;
    Ok(Value::Object(category.slot(settings).clone()))
}

/// Merges `update` into the category and returns the result.
pub fn update(
    store: &mut GmailStore,
    user_id: &str,
    category: Category,
    update: Value,
) -> SimResult<Value> {
    let settings = &mut store.mailbox_mut(user_id)?.settings;
    let slot = category.slot_mut(settings);
    for (field, value) in object(update) {
        slot.insert(field, value);
    }
    debug!(category = category.name(), "settings updated");
    Ok(Value::Object(slot.clone()))
}
