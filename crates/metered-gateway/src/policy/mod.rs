//! Access policy layer (header allow-list, verdict interpretation).
//!
//! Turns a request plus its resolved scope into one of the four verdicts,
//! delegating the actual decision to the external service.

pub mod allowlist;
pub mod engine;

pub use engine::{AccessGate, CheckOutcome};
