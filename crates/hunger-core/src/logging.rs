//! Structured logging schema and field name constants.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Session cannot continue (bad configuration) |
//! | WARN  | Fetch or submission failed, buffer degraded |
//! | INFO  | Lifecycle events (filter change, exhaustion, startup) |
//! | DEBUG | Refill decisions, stale responses, request parameters |
//! | TRACE | Per-item de-duplication and selection changes |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "buffer", "remote", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "controller", "selection", "submitter", "search", "robotoff"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "fetch_page", "annotate", "set_filter"
pub const OPERATION: &str = "op";

// ─── Buffer fields ─────────────────────────────────────────────────────────

/// Filter generation a fetch or response belongs to.
pub const GENERATION: &str = "generation";

/// Live filter generation at the time a response is applied.
pub const LIVE_GENERATION: &str = "live_generation";

/// Page number requested or received.
pub const PAGE: &str = "page";

/// Current `max_page` hint.
pub const MAX_PAGE: &str = "max_page";

/// Current buffer length.
pub const BUFFER_LEN: &str = "buffer_len";

/// Candidate item identifier.
pub const ITEM_ID: &str = "item_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of items in a page, batch or decision set.
pub const ITEM_COUNT: &str = "item_count";

/// Total count reported by the remote.
pub const TOTAL_COUNT: &str = "total_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
