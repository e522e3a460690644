//! Records API: items and employees over a partitioned document store

#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]
#![warn(missing_docs)]

/// HTTP routes
pub mod routes;

/// Server setup
pub mod server;

/// Shared API types
pub mod types;
