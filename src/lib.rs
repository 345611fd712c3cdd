//! Giant - a desktop client for running SQL against BigQuery.
//!
//! This library exposes the core modules to the binary and to integration
//! tests.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod project;
pub mod query;
pub mod server;
pub mod shell;
pub mod tui;
pub mod warehouse;
