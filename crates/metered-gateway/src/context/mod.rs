//! Scope context types shared across layers.
//!
//! A scope is resolved once at startup into an immutable value and passed
//! into every check; nothing here is mutated while serving.

pub mod scope;

pub use scope::{ResolvedScope, ScopeTable};
