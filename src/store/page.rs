use serde::Serialize;

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }
}

/// Decodes an offset token. Absent and empty tokens start from the beginning.
pub fn parse_token(token: Option<&str>) -> SimResult<usize> {
    match token.map(str::trim) {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| SimError::invalid(format!("invalid page token: {raw}"))),
    }
}

/// Cuts one page out of `items`, starting at `offset`.
///
/// A continuation token is only produced when items remain past the page.
pub fn paginate<T>(items: Vec<T>, offset: usize, size: usize) -> Page<T> {
    let total = items.len();
    let end = offset.saturating_add(size).min(total);
    let next_page_token = (end < total).then(|| end.to_string());
    let items = items.into_iter().skip(offset).take(size).collect();

    Page {
        items,
        next_page_token,
    }
}
