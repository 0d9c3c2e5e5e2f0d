use serde::{Deserialize, Serialize};

pub const MAX_PAGE_LIMIT: usize = 1000;

/// Keyset page request as received from the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageRequest<C> {
    pub limit: usize,
    #[serde(default)]
    pub after_cursor: Option<C>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult<T> {
    pub data: Vec<T>,
    pub has_more_rows: bool,
}

impl<C> PageRequest<C> {
    pub fn new(limit: usize, after_cursor: Option<C>) -> Self {
        Self { limit: limit.clamp(1, MAX_PAGE_LIMIT), after_cursor }
    }

    pub fn has_cursor(&self) -> bool {
        self.after_cursor.is_some()
    }

    /// Row count the query should ask the database for.
    pub fn overfetch_size(&self) -> usize {
        overfetch_size(self.page_limit(), self.has_cursor())
    }

    pub fn slice<T>(&self, rows: Vec<T>) -> PageResult<T> {
        slice(rows, self.page_limit(), self.has_cursor())
    }

    /// `limit` as deserialized is unchecked, so it is clamped on every use.
    fn page_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

/// One extra row detects a following page. A cursor query also returns the
/// cursor row itself first, which costs one more.
pub fn overfetch_size(limit: usize, cursor_supplied: bool) -> usize {
    let extra = if cursor_supplied { 2 } else { 1 };
    limit.saturating_add(extra)
}

/// Cuts rows fetched with [`overfetch_size`] down to a page.
///
/// With a cursor the first row is always the cursor row and never part of the
/// page. A result of one row or fewer means the cursor row alone (or nothing)
/// came back, so the page is empty.
pub fn slice<T>(mut rows: Vec<T>, limit: usize, cursor_supplied: bool) -> PageResult<T> {
    if cursor_supplied {
        if rows.len() <= 1 {
            return PageResult { data: Vec::new(), has_more_rows: false };
        }
        rows.remove(0);
    }

    let has_more_rows = rows.len() > limit;
    rows.truncate(limit);

    PageResult { data: rows, has_more_rows }
}
