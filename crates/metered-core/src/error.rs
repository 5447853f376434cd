//! Shared error type across metered crates.

use std::fmt;
use std::io;

use thiserror::Error;

/// Caller-facing outcome of an access check (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Continue handling the request.
    Allow,
    /// Explicitly denied by the decision service.
    Forbidden,
    /// The request itself is malformed; the client may fix it and retry.
    Unauthorized,
    /// Server-side fault, not attributable to the client.
    InternalError,
}

impl Verdict {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Allow => "ALLOW",
            Verdict::Forbidden => "FORBIDDEN",
            Verdict::Unauthorized => "UNAUTHORIZED",
            Verdict::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn is_allow(self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step of the decision round trip at which a channel failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelStage {
    Create,
    Connect,
    WritePreamble,
    WriteLength,
    WritePayload,
    Read,
    Close,
}

impl ChannelStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelStage::Create => "create",
            ChannelStage::Connect => "connect",
            ChannelStage::WritePreamble => "write-preamble",
            ChannelStage::WriteLength => "write-length",
            ChannelStage::WritePayload => "write-payload",
            ChannelStage::Read => "read",
            ChannelStage::Close => "close",
        }
    }
}

impl fmt::Display for ChannelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MeterError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum MeterError {
    #[error("encoding failed: {0}")]
    Encoding(String),
    #[error("decision channel failed at {stage}: {source}")]
    Channel {
        stage: ChannelStage,
        #[source]
        source: io::Error,
    },
    #[error("denied by decision service (response byte {0:#04x})")]
    Denied(u8),
    #[error("bad frame: {0}")]
    BadFrame(String),
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    #[error("invalid config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MeterError {
    pub fn channel(stage: ChannelStage, source: io::Error) -> Self {
        MeterError::Channel { stage, source }
    }

    /// Stage of a channel failure, if this is one.
    pub fn stage(&self) -> Option<ChannelStage> {
        match self {
            MeterError::Channel { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Stable error code for logs and test vectors.
    pub fn code(&self) -> &'static str {
        match self {
            MeterError::Encoding(_) => "ENCODING",
            MeterError::Channel { .. } => "CHANNEL",
            MeterError::Denied(_) => "DENIED",
            MeterError::BadFrame(_) => "BAD_FRAME",
            MeterError::UnsupportedVersion => "UNSUPPORTED_VERSION",
            MeterError::Config(_) => "CONFIG",
            MeterError::Internal(_) => "INTERNAL",
        }
    }

    /// Map internal error to the caller-facing verdict.
    pub fn verdict(&self) -> Verdict {
        match self {
            MeterError::Encoding(_) => Verdict::Unauthorized,
            MeterError::Denied(_) => Verdict::Forbidden,
            MeterError::Channel { .. }
            | MeterError::BadFrame(_)
            | MeterError::UnsupportedVersion
            | MeterError::Config(_)
            | MeterError::Internal(_) => Verdict::InternalError,
        }
    }
}
