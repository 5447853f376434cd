use std::sync::Arc;

use metered_core::error::{MeterError, Verdict};
use metered_core::protocol::{encode_payload, WireFrame, ALLOW_BYTE};
use metered_core::{extract, RequestView};

use crate::context::ResolvedScope;
use crate::ipc::{DecisionTransport, UnixDecisionChannel};

/// Result of one access check, before it is collapsed into a [`Verdict`].
#[derive(Debug)]
pub enum CheckOutcome {
    /// Scope disabled; no channel was opened.
    Bypass,
    /// Decision service answered `Y`.
    Granted,
    Refused(MeterError),
}

impl CheckOutcome {
    pub fn verdict(&self) -> Verdict {
        match self {
            CheckOutcome::Bypass | CheckOutcome::Granted => Verdict::Allow,
            CheckOutcome::Refused(e) => e.verdict(),
        }
    }

    pub fn error(&self) -> Option<&MeterError> {
        match self {
            CheckOutcome::Refused(e) => Some(e),
            _ => None,
        }
    }
}

/// Runs access checks against the decision service.
/// Construct once at startup, then share via `Clone`.
#[derive(Clone)]
pub struct AccessGate {
    transport: Arc<dyn DecisionTransport>,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(Arc::new(UnixDecisionChannel))
    }
}

impl AccessGate {
    pub fn new(transport: Arc<dyn DecisionTransport>) -> Self {
        Self { transport }
    }

    /// Extract, encode and frame. `Ok(None)` means the scope is bypassed.
    pub fn prepare<R>(&self, req: &R, scope: &ResolvedScope) -> metered_core::Result<Option<WireFrame>>
    where
        R: RequestView + ?Sized,
    {
        if !scope.enabled() {
            tracing::debug!(scope = %scope.name, "access check disabled for scope");
            return Ok(None);
        }

        let descriptor = extract(req, &scope.extract_headers, &scope.servername);
        let payload = encode_payload(&descriptor).map_err(|e| {
            tracing::warn!(scope = %scope.name, uri = %descriptor.uri, error = %e, "decision request not encodable");
            e
        })?;
        Ok(Some(WireFrame::new(payload)))
    }

    /// Blocking round trip for a prepared frame.
    pub fn decide(&self, scope: &ResolvedScope, frame: &WireFrame) -> CheckOutcome {
        decide_with(self.transport.as_ref(), scope, frame)
    }

    /// Whole check inline on the calling thread.
    pub fn check<R>(&self, req: &R, scope: &ResolvedScope) -> CheckOutcome
    where
        R: RequestView + ?Sized,
    {
        match self.prepare(req, scope) {
            Ok(Some(frame)) => self.decide(scope, &frame),
            Ok(None) => CheckOutcome::Bypass,
            Err(e) => CheckOutcome::Refused(e),
        }
    }

    /// Whole check from async code; the round trip runs on the blocking pool.
    pub async fn check_async<R>(&self, req: &R, scope: Arc<ResolvedScope>) -> CheckOutcome
    where
        R: RequestView + ?Sized,
    {
        let frame = match self.prepare(req, &scope) {
            Ok(Some(frame)) => frame,
            Ok(None) => return CheckOutcome::Bypass,
            Err(e) => return CheckOutcome::Refused(e),
        };

        let transport = Arc::clone(&self.transport);
        let task = tokio::task::spawn_blocking(move || decide_with(transport.as_ref(), &scope, &frame));
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => CheckOutcome::Refused(MeterError::Internal(format!(
                "decision task failed: {e}"
            ))),
        }
    }
}

fn decide_with(transport: &dyn DecisionTransport, scope: &ResolvedScope, frame: &WireFrame) -> CheckOutcome {
    match transport.round_trip(&scope.channel, frame) {
        Ok(ALLOW_BYTE) => {
            tracing::debug!(scope = %scope.name, "access granted");
            CheckOutcome::Granted
        }
        Ok(byte) => {
            tracing::info!(scope = %scope.name, reply = byte, "access denied by decision service");
            CheckOutcome::Refused(MeterError::Denied(byte))
        }
        Err(e) => CheckOutcome::Refused(e),
    }
}
