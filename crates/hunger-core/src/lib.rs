//! # hunger-core
//!
//! Core types, traits, and abstractions for the annotation work queue.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the remote clients and the buffer controller depend on.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod random;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{AnnotationEvent, EventBus, EventEnvelope};
pub use models::*;
pub use random::{FixedStartPage, ThreadRandom};
pub use traits::*;
