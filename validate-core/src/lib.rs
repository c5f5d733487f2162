//! Embeddable core library for validate.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking
//! into other host processes.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`PluginSource`](ports::PluginSource) — discover plugins
//! - [`WritePort`](ports::WritePort) — write files and create directories
//!
//! The [`adapters`] module provides default implementations.
//!
//! # Entry points
//!
//! - [`run_pipeline`](pipeline::run_pipeline) — run validators (and remediators) into a report
//! - [`describe_plugins`](pipeline::describe_plugins) — list descriptors and coverage notes

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

// Re-export the plugin contracts so embedders don't need validate-domain directly.
pub use validate_domain::{CancellationToken, PluginEntry, RunArgs};
