//! Shared primitives used across the cartconf crates: byte-offset spans
//! and line/column lookup for diagnostics.

pub mod span;

pub use span::{LineIndex, Span};
