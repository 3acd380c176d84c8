//! Collaborator traits for the buffer controller.
//!
//! These define the seams to the remote search API, the remote annotation
//! API and the random start page, so the controller can be driven by real
//! HTTP clients or by deterministic test doubles.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AnnotationRecord, Page, PageRequest};

// =============================================================================
// PAGE FETCHING
// =============================================================================

/// Source of candidate pages.
///
/// Implementations issue exactly one remote call per invocation. Cancellation
/// is the caller's concern: a response that arrives for a superseded filter
/// generation is simply dropped.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page of candidates.
    ///
    /// Errors surface as [`crate::Error::FetchFailed`] (or a transport
    /// variant); the caller decides on retries.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page>;
}

// =============================================================================
// ANNOTATION SUBMISSION
// =============================================================================

/// Remote destination for annotation decisions.
#[async_trait]
pub trait AnnotationSink: Send + Sync {
    /// Submit a batch of records in as few remote calls as the API allows.
    async fn annotate(&self, records: &[AnnotationRecord]) -> Result<()>;
}

// =============================================================================
// RANDOMNESS
// =============================================================================

/// Chooses the starting page of a new filter generation.
///
/// Randomizing the start decorrelates concurrent annotators so independent
/// sessions do not all work on the first page.
pub trait RandomSource: Send + Sync {
    /// Return a page number in `1..=ceiling`.
    fn start_page(&self, ceiling: u32) -> u32;
}
