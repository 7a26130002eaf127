//! Cursor- and offset-based pagination over a sorted result set.

use crate::model::Document;

const DEFAULT_LIMIT: usize = 50;

/// Pagination options recognized by `find`, per spec.md §6.
#[derive(Debug, Clone)]
pub struct PaginationOptions {
    pub limit: usize,
    pub offset: usize,
    /// Cursor for forward paging: return records following this id.
    pub after: Option<String>,
    /// Cursor for reverse paging: return records preceding this id.
    pub before: Option<String>,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, offset: 0, after: None, before: None }
    }
}

/// A page of results, per spec.md §6.
#[derive(Debug, Clone)]
pub struct Page {
    pub documents: Vec<Document>,
    pub total: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_cursor: String,
    pub prev_cursor: String,
}

fn doc_id(doc: &Document) -> &str {
    doc.get("_id").and_then(|v| v.as_str()).unwrap_or("")
}

/// Paginates a set of documents already sorted ascending by `_id`.
pub fn paginate(matched: Vec<Document>, options: &PaginationOptions) -> Page {
    let total = matched.len();
    let limit = options.limit.max(1);

    let start = if let Some(cursor) = &options.after {
        let idx = matched.iter().position(|d| doc_id(d) > cursor.as_str()).unwrap_or(matched.len());
        idx + options.offset
    } else if let Some(cursor) = &options.before {
        let end = matched.iter().position(|d| doc_id(d) >= cursor.as_str()).unwrap_or(matched.len());
        end.saturating_sub(limit)
    } else {
        options.offset
    };

    let start = start.min(matched.len());
    let end = (start + limit).min(matched.len());
    let documents = matched[start..end].to_vec();

    let has_prev = start > 0;
    let has_next = end < total;
    let next_cursor = if has_next { doc_id(&documents[documents.len() - 1]).to_string() } else { String::new() };
    let prev_cursor = if has_prev { doc_id(&documents[0]).to_string() } else { String::new() };

    Page { documents, total, has_next, has_prev, next_cursor, prev_cursor }
}
