//! Query dispatch for Giant.
//!
//! This module isolates the size check and execution path of a query from the
//! front end that triggers it.

pub mod dispatcher;

pub use dispatcher::{
    apply_outcome, DispatchOutcome, DispatchSettings, QueryDispatcher, QueryOutcome,
};
