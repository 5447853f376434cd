//! Decision request framing.
//!
//! ```text
//! meter.F3.01\r\n
//! Length: <N>\r\n
//! <N payload bytes, no trailing delimiter>
//! ```
//!
//! The reply is a single byte: `Y` allows, anything else denies.
//!
//! Parsing rules (decoder side):
//! - Never index raw buffers; lengths are checked before every split.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{MeterError, Result};

pub const PREAMBLE: &str = "meter.F3.";
pub const VERSION: &str = "01";
pub const DELIMITER: &str = "\r\n";
pub const LENGTH_PREFIX: &str = "Length: ";

/// `PREAMBLE + VERSION + DELIMITER`.
pub const PREAMBLE_LINE: &str = "meter.F3.01\r\n";

/// Reply byte that allows the request.
pub const ALLOW_BYTE: u8 = b'Y';

/// Immutable outbound frame, kept as the three segments the channel writes.
#[derive(Debug, Clone)]
pub struct WireFrame {
    preamble: Bytes,
    length_line: Bytes,
    payload: Bytes,
}

impl WireFrame {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let length_line = Bytes::from(format!("{LENGTH_PREFIX}{}{DELIMITER}", payload.len()));
        Self {
            preamble: Bytes::from_static(PREAMBLE_LINE.as_bytes()),
            length_line,
            payload,
        }
    }

    pub fn preamble(&self) -> &[u8] {
        &self.preamble
    }

    pub fn length_line(&self) -> &[u8] {
        &self.length_line
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Value announced on the length line.
    pub fn declared_len(&self) -> usize {
        self.payload.len()
    }

    /// Whole frame as one contiguous buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(
            self.preamble.len() + self.length_line.len() + self.payload.len(),
        );
        out.extend_from_slice(&self.preamble);
        out.extend_from_slice(&self.length_line);
        out.extend_from_slice(&self.payload);
        out.freeze()
    }
}

/// Decoded inbound frame (decision-service side).
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub version: String,
    pub payload: Bytes,
}

fn take_line(buf: &mut Bytes, what: &str) -> Result<Bytes> {
    let end = buf
        .windows(DELIMITER.len())
        .position(|w| w == DELIMITER.as_bytes())
        .ok_or_else(|| MeterError::BadFrame(format!("{what} line not terminated")))?;
    let line = buf.split_to(end);
    buf.advance(DELIMITER.len());
    Ok(line)
}

/// Decode a complete request frame. The buffer must hold exactly one frame.
pub fn decode_frame(mut buf: Bytes) -> Result<DecodedFrame> {
    let line = take_line(&mut buf, "preamble")?;
    let version = line
        .strip_prefix(PREAMBLE.as_bytes())
        .ok_or_else(|| MeterError::BadFrame("missing preamble".into()))?;
    if version != VERSION.as_bytes() {
        return Err(MeterError::UnsupportedVersion);
    }

    let line = take_line(&mut buf, "length")?;
    let digits = line
        .strip_prefix(LENGTH_PREFIX.as_bytes())
        .ok_or_else(|| MeterError::BadFrame("missing length header".into()))?;
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(MeterError::BadFrame("length is not a decimal number".into()));
    }
    let declared: usize = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| MeterError::BadFrame("length out of range".into()))?;

    if buf.remaining() < declared {
        return Err(MeterError::BadFrame(format!(
            "payload truncated: declared {declared}, got {}",
            buf.remaining()
        )));
    }
    if buf.remaining() > declared {
        return Err(MeterError::BadFrame(format!(
            "trailing bytes after payload: declared {declared}, got {}",
            buf.remaining()
        )));
    }

    Ok(DecodedFrame {
        version: VERSION.to_string(),
        payload: buf,
    })
}
