//! Protocol definitions for Hindsight distributed tracing.
//!
//! This crate defines the span model shared by the encoders: trace and span
//! ids, endpoints, annotations and the span itself.

mod error;
mod span;
mod trace_context;

pub use error::*;
pub use span::*;
pub use trace_context::*;
