//! Runtime configuration.

use std::time::Duration;

use roomline_core::HISTORY_PAGE_SIZE;
use roomline_proto::Collection;

/// Tunables for [`crate::Runtime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Upper bound on every backend call.
    pub call_timeout: Duration,
    /// Messages fetched by the initial history page and each catch-up page.
    pub history_page_size: usize,
    /// Credential store key holding the session token.
    pub token_key: String,
    /// Collection holding the room's messages.
    pub collection: Collection,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            history_page_size: HISTORY_PAGE_SIZE,
            token_key: "jwt".to_string(),
            collection: Collection::messages(),
        }
    }
}
