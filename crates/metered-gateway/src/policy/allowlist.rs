//! Header allow-list compilation.
//!
//! The configured spelling is what the decision service sees, so names are
//! validated but never rewritten.

use axum::http::HeaderName;
use metered_core::error::{MeterError, Result};

pub fn compile_extract_headers(raw: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(raw.len());
    for name in raw {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            MeterError::Config(format!("invalid extract_headers entry: {name:?}"))
        })?;
        out.push(name.clone());
    }
    Ok(out)
}
