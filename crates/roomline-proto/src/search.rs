//! Search and subscription parameters.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::Document;

/// Sortable field holding the server creation time.
pub const CREATED_AT_FIELD: &str = "_kuzzle_info.createdAt";

/// Index/collection pair addressing a set of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collection {
    /// Index (database) name.
    pub index: String,
    /// Collection name within the index.
    pub collection: String,
}

impl Collection {
    /// Address `collection` inside `index`.
    pub fn new(index: impl Into<String>, collection: impl Into<String>) -> Self {
        Self { index: index.into(), collection: collection.into() }
    }

    /// The shared chat room collection.
    pub fn messages() -> Self {
        Self::new("chat", "messages")
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.collection)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Dotted field path.
    pub field: String,
    /// Direction.
    pub order: Order,
}

/// Search request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Sort criteria, most significant first.
    pub sort: Vec<SortField>,
    /// Only documents created at or after this epoch millisecond.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_since: Option<i64>,
}

impl SearchQuery {
    /// Oldest messages first.
    pub fn by_creation_asc() -> Self {
        Self {
            sort: vec![SortField { field: CREATED_AT_FIELD.to_string(), order: Order::Asc }],
            created_since: None,
        }
    }

    /// Oldest first, restricted to documents created at or after `millis`.
    pub fn created_since(millis: i64) -> Self {
        Self { created_since: Some(millis), ..Self::by_creation_asc() }
    }

    /// Whether `document` satisfies the query's range constraint.
    pub fn matches(&self, document: &Document) -> bool {
        match (self.created_since, document.created_at_millis()) {
            (None, _) => true,
            (Some(since), Some(created_at)) => created_at >= since,
            (Some(_), None) => false,
        }
    }

    /// Compare two documents under this query's sort criteria.
    ///
    /// Unknown fields compare equal so they never reorder results.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for criterion in &self.sort {
            let ordering = match criterion.field.as_str() {
                CREATED_AT_FIELD => a.created_at_millis().cmp(&b.created_at_millis()),
                "author" => a.source.author.cmp(&b.source.author),
                "text" => a.source.text.cmp(&b.source.text),
                _ => Ordering::Equal,
            };
            let ordering = match criterion.order {
                Order::Asc => ordering,
                Order::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Result window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Offset of the first hit.
    pub from: usize,
    /// Maximum number of hits.
    pub size: usize,
}

impl Pagination {
    /// First `size` hits.
    pub fn first(size: usize) -> Self {
        Self { from: 0, size }
    }
}

/// Search response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Hits in query order.
    pub hits: Vec<Document>,
    /// Total number of matching documents, ignoring pagination.
    pub total: usize,
}

/// Realtime subscription filter.
///
/// An empty filter matches every document in the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Only documents written by this author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Filter {
    /// Match every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether `document` passes the filter.
    pub fn matches(&self, document: &Document) -> bool {
        self.author.as_ref().is_none_or(|author| *author == document.source.author)
    }
}
