//! metered gateway library entry.
//!
//! This crate wires config, scope resolution, the decision channel, the
//! verdict interpreter and the HTTP middleware into a gate that sits in
//! front of a protected application. It is intended to be consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod context;
pub mod ipc;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod router;
pub mod transport;
