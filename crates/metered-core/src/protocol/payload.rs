//! Decision request payload (JSON).
//!
//! Key order is fixed: `userAgent, servername, uri, ip, headers`.
//! `headers` is always present, possibly as `[]`.

use serde::Serialize;

use crate::descriptor::RequestDescriptor;
use crate::error::{MeterError, Result};

#[derive(Debug, Serialize)]
struct DecisionRequest<'a> {
    #[serde(rename = "userAgent")]
    user_agent: &'a str,
    servername: &'a str,
    uri: &'a str,
    ip: &'a str,
    headers: Vec<HeaderEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct HeaderEntry<'a> {
    name: &'a str,
    value: &'a str,
}

fn utf8<'a>(field: &str, raw: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(raw)
        .map_err(|e| MeterError::Encoding(format!("{field} is not valid utf-8: {e}")))
}

/// Serialize a descriptor into the payload bytes sent after the length line.
///
/// Fails with [`MeterError::Encoding`] when a client-supplied value is not
/// valid UTF-8.
pub fn encode_payload(d: &RequestDescriptor) -> Result<Vec<u8>> {
    let headers = d
        .headers
        .iter()
        .map(|h| {
            Ok(HeaderEntry {
                name: &h.name,
                value: utf8(&h.name, &h.value)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let req = DecisionRequest {
        user_agent: utf8("userAgent", &d.user_agent)?,
        servername: &d.servername,
        uri: &d.uri,
        ip: &d.client_ip,
        headers,
    };

    serde_json::to_vec(&req).map_err(|e| MeterError::Encoding(e.to_string()))
}
