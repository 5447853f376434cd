use std::path::PathBuf;
use std::sync::Arc;

use metered_core::error::Result;

use crate::config::{GatewayConfig, ScopeSection};
use crate::ipc::ChannelConfig;
use crate::policy::allowlist::compile_extract_headers;

/// Name of the scope that applies when no path prefix matches.
pub const DEFAULT_SCOPE: &str = "default";

/// Effective access-check settings of one scope.
#[derive(Debug, Clone)]
pub struct ResolvedScope {
    /// `path_prefix`, or `default`.
    pub name: String,
    pub channel: ChannelConfig,
    pub extract_headers: Vec<String>,
    pub servername: String,
}

impl ResolvedScope {
    pub fn from_section(name: &str, section: &ScopeSection) -> Result<Self> {
        let extract_headers = compile_extract_headers(section.extract_headers())?;

        Ok(Self {
            name: name.to_string(),
            channel: ChannelConfig {
                socket_path: PathBuf::from(section.ipc_socket_path()),
                io_timeout_secs: section.io_timeout_secs(),
                enabled: section.enabled(),
            },
            extract_headers,
            servername: section.servername().to_string(),
        })
    }

    pub fn enabled(&self) -> bool {
        self.channel.enabled
    }
}

/// Path-prefix lookup over the resolved scopes.
///
/// Prefixes match as plain string prefixes; the longest one wins.
#[derive(Debug, Clone)]
pub struct ScopeTable {
    default: Arc<ResolvedScope>,
    // longest prefix first
    scopes: Vec<(String, Arc<ResolvedScope>)>,
}

impl ScopeTable {
    pub fn from_config(cfg: &GatewayConfig) -> Result<Self> {
        let default = Arc::new(ResolvedScope::from_section(DEFAULT_SCOPE, &cfg.defaults)?);

        let mut scopes = Vec::with_capacity(cfg.scopes.len());
        for s in &cfg.scopes {
            let section = s.section().merged_over(&cfg.defaults);
            let resolved = ResolvedScope::from_section(&s.path_prefix, &section)?;
            tracing::info!(
                scope = %s.path_prefix,
                enabled = resolved.enabled(),
                socket = %resolved.channel.socket_path.display(),
                "access scope resolved"
            );
            scopes.push((s.path_prefix.clone(), Arc::new(resolved)));
        }
        scopes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Ok(Self { default, scopes })
    }

    pub fn resolve(&self, path: &str) -> Arc<ResolvedScope> {
        self.scopes
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, scope)| Arc::clone(scope))
            .unwrap_or_else(|| Arc::clone(&self.default))
    }
}
