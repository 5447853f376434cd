//! Shared application state for the metered gateway.
//!
//! Built once at startup: scopes are resolved and validated here, so a bad
//! config fails the boot instead of the first request.

use std::sync::Arc;

use metered_core::error::Result;

use crate::config::GatewayConfig;
use crate::context::ScopeTable;
use crate::obs::GatewayMetrics;
use crate::policy::AccessGate;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    scopes: ScopeTable,
    gate: AccessGate,
    metrics: GatewayMetrics,
}

impl AppState {
    /// Build application state with the Unix socket decision channel.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        Self::with_gate(cfg, AccessGate::default())
    }

    pub fn with_gate(cfg: GatewayConfig, gate: AccessGate) -> Result<Self> {
        let scopes = ScopeTable::from_config(&cfg)?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                scopes,
                gate,
                metrics: GatewayMetrics::default(),
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn scopes(&self) -> &ScopeTable {
        &self.inner.scopes
    }

    pub fn gate(&self) -> &AccessGate {
        &self.inner.gate
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }
}
