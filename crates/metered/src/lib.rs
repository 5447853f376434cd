//! Top-level facade crate for the metered access gate.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use metered_core::*;
}

pub mod gateway {
    pub use metered_gateway::*;
}
