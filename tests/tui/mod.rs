//! End-to-end tests of the terminal UI state against a running shell.

pub mod common;
pub mod flow_test;
