//! Centralized default constants for the annotation work queue.
//!
//! **This module is the single source of truth** for shared default values.
//! Configuration structs in other crates fall back to these when the
//! corresponding environment variable is unset.

// =============================================================================
// BUFFER
// =============================================================================

/// Buffer length below which a background page fetch is triggered.
pub const BUFFER_THRESHOLD: usize = 10;

/// Number of candidates requested per page.
pub const PAGE_SIZE: u32 = 50;

/// Upper bound (inclusive) for the randomized starting page.
///
/// Also used as the `max_page` hint before the first response arrives.
pub const START_PAGE_CEILING: u32 = 100;

/// Consecutive empty pages skipped before the cursor is declared exhausted.
pub const MAX_EMPTY_PAGE_SKIPS: u32 = 5;

/// Delay before a batch-mode answer evicts its item from the buffer.
pub const BATCH_PENDING_DELAY_MS: u64 = 100;

// =============================================================================
// REMOTE
// =============================================================================

/// Open Food Facts product search endpoint.
pub const OFF_SEARCH_URL: &str = "https://world.openfoodfacts.org/cgi/search.pl";

/// By-identifier product endpoint base (the code and `.json` are appended).
pub const OFF_PRODUCT_URL: &str = "https://fr.openfoodfacts.org/api/v3/product";

/// Robotoff API base URL.
pub const ROBOTOFF_URL: &str = "https://robotoff.openfoodfacts.org/api/v1";

/// Default language for question text.
pub const LANG: &str = "en";

/// Default country used by the product search when none is configured.
pub const PRODUCT_COUNTRY: &str = "en:france";

/// Pseudo-country meaning "no country filter" for question queries.
pub const WORLD_COUNTRY: &str = "en:world";

/// Default HTTP request timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent sent to the remote APIs.
pub const USER_AGENT: &str = concat!("hunger-games-rs/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// EVENTS
// =============================================================================

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_below_page_size() {
        assert!((BUFFER_THRESHOLD as u32) < PAGE_SIZE);
    }

    #[test]
    fn test_start_page_ceiling_positive() {
        assert!(START_PAGE_CEILING >= 1);
    }

    #[test]
    fn test_user_agent_has_version() {
        assert!(USER_AGENT.starts_with("hunger-games-rs/"));
    }
}
