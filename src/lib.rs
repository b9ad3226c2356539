//! Crewdeck sync core.
//!
//! This crate is the data synchronization and reference-resolution layer
//! behind the Crewdeck dashboard. It pulls loosely-shaped records from a
//! remote tabular store, normalizes them into canonical entities, resolves
//! cross-entity references, and keeps a persisted local cache that the UI
//! reads synchronously. Local edits are applied optimistically and reverted
//! if the remote write fails.
//!
//! # Architecture
//!
//! - [`csv`] - Delimited-text tokenizer for imports
//! - [`model`] - Canonical entities (Staff, Workstream, Deliverable, ...)
//! - [`normalize`] - Raw-record to canonical-entity normalization
//! - [`resolve`] - Reference resolution (id / email / display name)
//! - [`store`] - Persisted local cache with change notification
//! - [`remote`] - Remote store contract and HTTP client
//! - [`sync`] - Ordered pull pipeline and connectivity status
//! - [`mutate`] - Optimistic mutation protocol with rollback
//! - [`config`] - Cache path and remote endpoint resolution
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod csv;
pub mod error;
pub mod model;
pub mod mutate;
pub mod normalize;
pub mod remote;
pub mod resolve;
pub mod store;
pub mod sync;

pub use error::{Error, Result};

/// Set up tracing for embedders that don't bring their own subscriber.
///
/// Honors `RUST_LOG` if set, otherwise maps the verbosity level:
/// 0 = warn, 1 = info, 2 = debug, 3+ = trace.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
