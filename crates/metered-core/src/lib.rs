//! metered core: transport-agnostic access-check primitives.
//!
//! This crate defines the request view the gate reads, the descriptor built
//! from it, the JSON payload and wire framing of the decision protocol, and
//! the error/verdict surface shared with the gateway. It intentionally carries
//! no socket or runtime dependencies so a decision service can reuse the same
//! protocol code.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `MeterError`/`Result` so a hostile
//! header value can never take the host down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod descriptor;
pub mod error;
pub mod protocol;

pub use descriptor::{extract, HeaderPair, RequestDescriptor, RequestView};
/// Shared result type.
pub use error::{ChannelStage, MeterError, Result, Verdict};
