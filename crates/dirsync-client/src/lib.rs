//! Typed HTTP client for the remote directory API.
//!
//! The directory exposes flat list endpoints for users and groups (with
//! `filter`, `limit`, and `skip` query parameters) plus graph endpoints for
//! the membership and association edges between them. This crate wraps those
//! endpoints behind [`client::DirectoryClient`] with explicit request and
//! response types, structured error mapping, and a reusable retry policy.
//!
//! No process-wide state: callers construct a [`config::DirectoryConfig`]
//! per use and share the (cheaply clonable) client by value.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod retry;

pub use client::{eq_filter, DirectoryClient};
pub use config::DirectoryConfig;
pub use error::{DirectoryError, DirectoryResult};
pub use retry::RetryPolicy;
