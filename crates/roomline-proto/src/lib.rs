//! Backend wire shapes for roomline.
//!
//! The chat backend is a document store with realtime notifications. This
//! crate defines the subset of its data model the client touches: message
//! documents, creation notifications, and the search/subscription parameters
//! used to read them.
//!
//! # Components
//!
//! - [`Document`]: a stored message with backend metadata
//! - [`Notification`]: a realtime push describing a document change
//! - [`SearchQuery`], [`Pagination`], [`SearchResult`]: history reads
//! - [`Collection`], [`Filter`]: where to read and what to subscribe to

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod document;
pub mod errors;
mod notification;
mod search;

pub use document::{Document, Metadata, MessageBody, NewMessage};
pub use errors::ProtocolError;
pub use notification::{ACTION_CREATE, KIND_DOCUMENT, Notification};
pub use search::{
    CREATED_AT_FIELD, Collection, Filter, Order, Pagination, SearchQuery, SearchResult, SortField,
};
