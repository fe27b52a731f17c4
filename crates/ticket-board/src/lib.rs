//! Board rendering for ticket summaries.
//!
//! Turns ticket snapshots into fixed-width, markup-safe lines in normal or wide
//! mode. The markup dialect is injected so output can be verified without a
//! transport.

pub mod board;
pub mod markup;

pub use board::*;
pub use markup::*;
