//! Decision protocol: JSON payload + line-framed envelope.
//!
//! - Payload: the request descriptor as a JSON object.
//! - Frame: preamble line, length line, then the raw payload bytes.
//!
//! Both sides are pure and socket-agnostic. The decoder is panic-free:
//! malformed input is reported as `MeterError` instead of panicking or
//! indexing raw buffers.

pub mod frame;
pub mod payload;

pub use frame::{decode_frame, DecodedFrame, WireFrame, ALLOW_BYTE};
pub use payload::encode_payload;
