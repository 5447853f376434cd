//! Lightweight in-process metrics.
//!
//! Check verdicts, channel failure stages and check latency are stored as
//! atomics and rendered by the `/metrics` handler in Prometheus text format.

pub mod metrics;

pub use metrics::GatewayMetrics;
