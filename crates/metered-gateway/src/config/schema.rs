use std::collections::HashSet;
use std::net::SocketAddr;

use serde::Deserialize;
use metered_core::error::{MeterError, Result};

/// `sockaddr_un.sun_path` capacity.
pub const MAX_SOCKET_PATH_BYTES: usize = 108;
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SERVERNAME: &str = "unset";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    /// Parent of every scope; also applies to paths no scope matches.
    #[serde(default)]
    pub defaults: ScopeSection,

    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MeterError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.defaults.validate_as("defaults")?;

        let mut seen = HashSet::new();
        for s in &self.scopes {
            if !s.path_prefix.starts_with('/') {
                return Err(MeterError::Config(format!(
                    "scopes.path_prefix must start with '/': {}",
                    s.path_prefix
                )));
            }
            if !seen.insert(s.path_prefix.as_str()) {
                return Err(MeterError::Config(format!(
                    "duplicate scope path_prefix: {}",
                    s.path_prefix
                )));
            }
            s.section()
                .merged_over(&self.defaults)
                .validate_as(&s.path_prefix)?;
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen.parse::<SocketAddr>().map_err(|e| {
            MeterError::Config(format!("gateway.listen must be a socket address: {e}"))
        })?;
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

/// Access-check settings. Unset fields inherit from the parent section,
/// then fall back to the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeSection {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub ipc_socket_path: Option<String>,
    #[serde(default)]
    pub io_timeout_secs: Option<u64>,
    #[serde(default)]
    pub extract_headers: Option<Vec<String>>,
    #[serde(default)]
    pub servername: Option<String>,
}

impl ScopeSection {
    /// Fill unset fields from `parent`.
    pub fn merged_over(&self, parent: &ScopeSection) -> ScopeSection {
        ScopeSection {
            enabled: self.enabled.or(parent.enabled),
            ipc_socket_path: self
                .ipc_socket_path
                .clone()
                .or_else(|| parent.ipc_socket_path.clone()),
            io_timeout_secs: self.io_timeout_secs.or(parent.io_timeout_secs),
            extract_headers: self
                .extract_headers
                .clone()
                .or_else(|| parent.extract_headers.clone()),
            servername: self.servername.clone().or_else(|| parent.servername.clone()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }

    pub fn ipc_socket_path(&self) -> &str {
        self.ipc_socket_path.as_deref().unwrap_or("")
    }

    pub fn io_timeout_secs(&self) -> u64 {
        self.io_timeout_secs.unwrap_or(DEFAULT_IO_TIMEOUT_SECS)
    }

    pub fn extract_headers(&self) -> &[String] {
        self.extract_headers.as_deref().unwrap_or(&[])
    }

    pub fn servername(&self) -> &str {
        self.servername.as_deref().unwrap_or(DEFAULT_SERVERNAME)
    }

    /// Checks the effective values; `label` names the section in errors.
    pub fn validate_as(&self, label: &str) -> Result<()> {
        let path = self.ipc_socket_path();
        if path.len() > MAX_SOCKET_PATH_BYTES {
            return Err(MeterError::Config(format!(
                "{label}: ipc_socket_path is {} bytes, at most {MAX_SOCKET_PATH_BYTES} allowed",
                path.len()
            )));
        }
        if self.enabled() && path.is_empty() {
            return Err(MeterError::Config(format!(
                "{label}: enabled scope requires ipc_socket_path"
            )));
        }
        Ok(())
    }
}

/// One routing scope, selected by longest `path_prefix` match.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    pub path_prefix: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub ipc_socket_path: Option<String>,
    #[serde(default)]
    pub io_timeout_secs: Option<u64>,
    #[serde(default)]
    pub extract_headers: Option<Vec<String>>,
    #[serde(default)]
    pub servername: Option<String>,
}

impl ScopeConfig {
    /// Own settings, before inheritance.
    pub fn section(&self) -> ScopeSection {
        ScopeSection {
            enabled: self.enabled,
            ipc_socket_path: self.ipc_socket_path.clone(),
            io_timeout_secs: self.io_timeout_secs,
            extract_headers: self.extract_headers.clone(),
            servername: self.servername.clone(),
        }
    }
}
