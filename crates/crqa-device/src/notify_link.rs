//! The Device Model's notification-mode link to the Compute Server (§4.3.3).
//!
//! Unlike [`crate::compute_link::ComputeLink`], which blocks the triggering
//! bus access until the response arrives, `NotificationLink` sends the
//! Request frame and returns immediately. The response is picked up later by
//! [`NotificationLink::poll_response`], called from the Device Model's event
//! loop once the wake counter fires — never inline with the bus write that
//! armed the request.

use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crqa_protocol::{DecodeError, RequestFrame, ResponseFrame, RESPONSE_FRAME_SIZE};

use crate::wake::{self, WakeCounter};

#[derive(Debug, Error)]
pub enum NotificationLinkError {
    #[error("i/o error talking to the compute server: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response frame: {0}")]
    Decode(#[from] DecodeError),
    #[error("wake handle error: {0}")]
    Wake(#[from] nix::errno::Errno),
}

/// One persistent connection plus the wake counter handed to the Compute
/// Server once, on first connect, via the ancillary-fd handshake (§9
/// "Ancillary-fd handshake": a one-shot capability grant, not a per-request
/// field).
pub struct NotificationLink {
    socket_path: PathBuf,
    conn: Option<UnixStream>,
    wake: WakeCounter,
}

impl NotificationLink {
    pub fn new(socket_path: impl Into<PathBuf>) -> nix::Result<Self> {
        Ok(Self {
            socket_path: socket_path.into(),
            conn: None,
            wake: WakeCounter::new()?,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    fn ensure_connected(&mut self) -> Result<(), NotificationLinkError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let stream = UnixStream::connect(&self.socket_path)?;
        wake::send_wake_handle(stream.as_raw_fd(), self.wake.as_fd())?;
        self.conn = Some(stream);
        Ok(())
    }

    /// Sends the Request frame and returns without waiting for a response.
    /// A write failure drops the held connection so the next dispatch
    /// reconnects and re-sends the handshake.
    pub fn dispatch(&mut self, frame: &RequestFrame) -> Result<(), NotificationLinkError> {
        self.ensure_connected()?;
        let stream = self.conn.as_mut().expect("just connected");
        if let Err(err) = stream.write_all(&frame.to_bytes()) {
            self.conn = None;
            return Err(err.into());
        }
        Ok(())
    }

    /// Non-blocking: `Ok(None)` if the wake counter has not fired yet.
    /// Once it has, reads exactly one Response frame off the held
    /// connection. A short read or decode failure drops the connection so
    /// the caller can treat the in-flight request as failed.
    pub fn poll_response(&mut self) -> Result<Option<ResponseFrame>, NotificationLinkError> {
        if self.wake.try_drain()?.is_none() {
            return Ok(None);
        }
        let stream = self.conn.as_mut().expect("wake fired before any dispatch");
        let mut buf = [0u8; RESPONSE_FRAME_SIZE];
        let result = stream.read_exact(&mut buf).map_err(NotificationLinkError::from).and_then(|()| {
            ResponseFrame::from_bytes(&buf).map_err(NotificationLinkError::from)
        });
        if result.is_err() {
            self.conn = None;
        }
        result.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crqa_protocol::SIGNAL_LEN;
    use std::os::unix::net::UnixListener;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn dispatch_then_poll_round_trips_after_server_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crqa.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let handle = crate::wake::recv_wake_handle(stream.as_raw_fd()).unwrap();

            let mut req = vec![0u8; std::mem::size_of::<RequestFrame>()];
            stream.read_exact(&mut req).unwrap();

            let response = ResponseFrame {
                epsilon: 1.0,
                recurrence_rate: 1.0,
                determinism: 1.0,
                laminarity: 1.0,
                trapping_time: 1.0,
                max_diag_line: 2.0,
                divergence: 0.5,
                entropy: 0.0,
            };
            stream.write_all(&response.to_bytes()).unwrap();
            wake::notify(&handle).unwrap();
        });

        let mut link = NotificationLink::new(&path).unwrap();
        let frame = RequestFrame::new(0.15, [0.0; SIGNAL_LEN], [0.0; SIGNAL_LEN], 1, true);
        link.dispatch(&frame).unwrap();

        let mut response = None;
        for _ in 0..200 {
            if let Some(r) = link.poll_response().unwrap() {
                response = Some(r);
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        let response = response.expect("compute server should have notified by now");
        assert_eq!(response.epsilon, 1.0);
        assert_eq!(response.max_diag_line, 2.0);

        server.join().unwrap();
    }
}
