//! Stub decision service shared by the gateway integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use bytes::Bytes;
use metered_core::protocol::decode_frame;

/// Accept `n` connections, answer each with `reply`, and forward every
/// decoded payload to the returned receiver.
pub fn spawn_decider(path: &Path, reply: u8, n: usize) -> mpsc::Receiver<serde_json::Value> {
    let listener = UnixListener::bind(path).unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for _ in 0..n {
            let (mut stream, _) = listener.accept().unwrap();
            let mut raw = Vec::new();
            {
                let mut reader = BufReader::new(&stream);
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                raw.extend_from_slice(line.as_bytes());
                line.clear();
                reader.read_line(&mut line).unwrap();
                raw.extend_from_slice(line.as_bytes());
                let len: usize = line
                    .trim_end()
                    .strip_prefix("Length: ")
                    .unwrap()
                    .parse()
                    .unwrap();
                let mut body = vec![0u8; len];
                reader.read_exact(&mut body).unwrap();
                raw.extend_from_slice(&body);
            }
            let frame = decode_frame(Bytes::from(raw)).unwrap();
            stream.write_all(&[reply]).unwrap();
            let _ = tx.send(serde_json::from_slice(&frame.payload).unwrap());
        }
    });
    rx
}
