//! Blocking decision channel over a Unix domain stream socket.
//!
//! One round trip per check, on a socket nobody else sees:
//!
//! ```text
//! Init -> SocketCreated -> Connected -> PreambleSent -> LengthSent
//!      -> PayloadSent -> ResponseRead -> Closed
//! ```
//!
//! Any step may end in `Errored(stage)`. Only the final one-byte read is
//! bounded by the configured timeout; connect and the writes block for as
//! long as the peer takes. Each frame segment goes out in a single `write`;
//! a short write fails the check instead of being resumed.

use std::io::{self, Read, Write};
use std::mem;
use std::os::fd::{FromRawFd, IntoRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use metered_core::error::{ChannelStage, MeterError, Result};
use metered_core::protocol::WireFrame;

#[cfg(target_os = "linux")]
const SOCK_FLAGS: libc::c_int = libc::SOCK_CLOEXEC;
#[cfg(not(target_os = "linux"))]
const SOCK_FLAGS: libc::c_int = 0;

/// Resolved channel settings of one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub socket_path: PathBuf,
    /// Receive timeout in seconds; 0 waits forever.
    pub io_timeout_secs: u64,
    pub enabled: bool,
}

impl ChannelConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        match self.io_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Progress of a single round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Init,
    SocketCreated,
    Connected,
    PreambleSent,
    LengthSent,
    PayloadSent,
    ResponseRead,
    Closed,
    Errored(ChannelStage),
}

/// Sends one frame and returns the decision byte.
///
/// Implementations must not reuse connections across calls.
pub trait DecisionTransport: Send + Sync {
    fn round_trip(&self, cfg: &ChannelConfig, frame: &WireFrame) -> Result<u8>;
}

/// The production transport: a fresh Unix socket per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixDecisionChannel;

impl DecisionTransport for UnixDecisionChannel {
    fn round_trip(&self, cfg: &ChannelConfig, frame: &WireFrame) -> Result<u8> {
        let mut rt = RoundTrip::new(&cfg.socket_path);
        let res = rt.run(cfg, frame);
        tracing::trace!(state = ?rt.state, socket = %cfg.socket_path.display(), "decision round trip finished");
        res
    }
}

struct RoundTrip<'a> {
    socket: &'a Path,
    state: ChannelState,
}

impl<'a> RoundTrip<'a> {
    fn new(socket: &'a Path) -> Self {
        Self {
            socket,
            state: ChannelState::Init,
        }
    }

    fn fail(&mut self, stage: ChannelStage, err: io::Error) -> MeterError {
        tracing::error!(
            stage = %stage,
            socket = %self.socket.display(),
            error = %err,
            "decision channel failed"
        );
        self.state = ChannelState::Errored(stage);
        MeterError::channel(stage, err)
    }

    fn run(&mut self, cfg: &ChannelConfig, frame: &WireFrame) -> Result<u8> {
        let fd = create_socket().map_err(|e| self.fail(ChannelStage::Create, e))?;
        let stream = UnixStream::from(fd);
        self.state = ChannelState::SocketCreated;

        stream
            .set_read_timeout(cfg.read_timeout())
            .map_err(|e| self.fail(ChannelStage::Create, e))?;

        // From here on every early return drops `stream`, closing it best-effort.
        connect(&stream, self.socket).map_err(|e| self.fail(ChannelStage::Connect, e))?;
        self.state = ChannelState::Connected;

        write_once(&stream, frame.preamble())
            .map_err(|e| self.fail(ChannelStage::WritePreamble, e))?;
        self.state = ChannelState::PreambleSent;

        write_once(&stream, frame.length_line())
            .map_err(|e| self.fail(ChannelStage::WriteLength, e))?;
        self.state = ChannelState::LengthSent;

        let n = write_once(&stream, frame.payload())
            .map_err(|e| self.fail(ChannelStage::WritePayload, e))?;
        self.state = ChannelState::PayloadSent;
        tracing::debug!(bytes = n, socket = %self.socket.display(), "decision request written");

        let reply = read_reply(&stream).map_err(|e| self.fail(ChannelStage::Read, e))?;
        self.state = ChannelState::ResponseRead;

        close(stream).map_err(|e| self.fail(ChannelStage::Close, e))?;
        self.state = ChannelState::Closed;

        tracing::debug!(reply = %char::from(reply), socket = %self.socket.display(), "decision service replied");
        Ok(reply)
    }
}

fn create_socket() -> io::Result<OwnedFd> {
    // SAFETY: plain syscall, the result is checked before use.
    let fd = unsafe { libc::socket(libc::AF_UNIX, libc::SOCK_STREAM | SOCK_FLAGS, 0) };
    if fd == -1 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `fd` is a freshly created descriptor nobody else owns.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn connect(stream: &UnixStream, path: &Path) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    // SAFETY: all-zero is a valid `sockaddr_un`.
    let mut addr: libc::sockaddr_un = unsafe { mem::zeroed() };
    addr.sun_family = libc::AF_UNIX as libc::sa_family_t;

    let bytes = path.as_os_str().as_bytes();
    if bytes.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty socket path"));
    }
    if bytes.len() > addr.sun_path.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "socket path is {} bytes, at most {} allowed",
                bytes.len(),
                addr.sun_path.len()
            ),
        ));
    }
    for (dst, src) in addr.sun_path.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }

    // A path filling sun_path entirely goes without the trailing NUL.
    let nul = usize::from(bytes.len() < addr.sun_path.len());
    let len = mem::offset_of!(libc::sockaddr_un, sun_path) + bytes.len() + nul;

    // SAFETY: `addr` is initialised and `len` does not exceed its size.
    let rc = unsafe {
        libc::connect(
            stream.as_raw_fd(),
            &addr as *const libc::sockaddr_un as *const libc::sockaddr,
            len as libc::socklen_t,
        )
    };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn write_once(mut stream: &UnixStream, buf: &[u8]) -> io::Result<usize> {
    let n = stream.write(buf)?;
    if n != buf.len() {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write: {n} of {} bytes", buf.len()),
        ));
    }
    Ok(n)
}

fn read_reply(mut stream: &UnixStream) -> io::Result<u8> {
    let mut byte = [0u8; 1];
    match stream.read(&mut byte) {
        Ok(1) => Ok(byte[0]),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "decision service closed the connection without replying",
        )),
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "no reply before the receive timeout",
            ))
        }
        Err(e) => Err(e),
    }
}

/// Close explicitly so a failing `close(2)` is observed instead of ignored by `Drop`.
fn close(stream: UnixStream) -> io::Result<()> {
    let fd = stream.into_raw_fd();
    // SAFETY: `into_raw_fd` released ownership; the descriptor is closed exactly once.
    if unsafe { libc::close(fd) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
