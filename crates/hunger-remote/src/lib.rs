//! # hunger-remote
//!
//! HTTP clients for the remote candidate and annotation APIs:
//!
//! - [`SearchClient`]: a [`hunger_core::PageSource`] over the Open Food Facts
//!   product search and the Robotoff question endpoints
//! - [`RobotoffClient`]: a [`hunger_core::AnnotationSink`] posting insight and
//!   logo annotations
//! - [`QueryBuilder`]: the pure filter-to-request mapping both rely on
//!
//! ## Mock Backend
//!
//! The `mock` feature exposes [`mock::MockPageSource`] and
//! [`mock::MockAnnotationSink`] for deterministic tests without a network.

pub mod config;
pub mod error;
pub mod query;
pub mod robotoff;
pub mod search;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::RemoteConfig;
pub use error::RemoteErrorCode;
pub use query::{QueryBuilder, QueryDescriptor, ResponseShape};
pub use robotoff::RobotoffClient;
pub use search::SearchClient;
