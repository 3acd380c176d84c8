//! # hunger-buffer
//!
//! The annotation work-queue buffer.
//!
//! - [`BufferController`]: keeps a lookahead queue of candidates above a refill
//!   threshold, discards responses from superseded filter generations, and
//!   evicts answered items optimistically
//! - [`SelectionManager`]: batch-mode selection with toggle, shift-click range
//!   and keyboard extension
//! - [`AnnotationSubmitter`]: fire-and-forget submission reporting through the
//!   event bus
//!
//! [`BufferState`] is the synchronous core the controller drives; it can be
//! used directly where no async runtime is available.

pub mod config;
pub mod controller;
pub mod cursor;
pub mod selection;
pub mod state;
pub mod submitter;

pub use config::BufferConfig;
pub use controller::{BatchAnswer, BufferController, BufferControllerBuilder};
pub use cursor::{FetchCursor, PageStep};
pub use selection::{compute_range, Direction, RangeSelection, SelectionManager};
pub use state::{BufferSnapshot, BufferState, BufferStatus, FetchOutcome, FetchTicket};
pub use submitter::{AnnotationSubmitter, SubmissionReport};
