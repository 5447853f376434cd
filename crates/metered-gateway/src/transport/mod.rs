//! Transport layer (HTTP).
//!
//! Exposes the access-phase middleware and the request view it hands to the
//! gate, plus the verdict-to-status mapping.

pub mod http;
