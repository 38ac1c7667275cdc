//! The Device Model's client side of the Compute Server exchange: write one
//! Request frame, read one Response frame.
//!
//! Two connection policies coexist, matching the reference implementation's
//! two device variants: [`ComputeLink::transient`] reconnects for every
//! request (used by the register-mode trigger), and
//! [`ComputeLink::persistent`] keeps one connection open and only
//! reconnects when it has gone bad (used by the shared-buffer trigger).

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use nix::sys::socket::{getsockopt, sockopt::SocketError};
use thiserror::Error;

use crqa_protocol::{DecodeError, RequestFrame, ResponseFrame, RESPONSE_FRAME_SIZE};

#[derive(Debug, Error)]
pub enum ComputeLinkError {
    #[error("i/o error talking to the compute server: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response frame: {0}")]
    Decode(#[from] DecodeError),
}

pub struct ComputeLink {
    socket_path: PathBuf,
    persistent: bool,
    conn: Option<UnixStream>,
}

impl ComputeLink {
    pub fn transient(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            persistent: false,
            conn: None,
        }
    }

    pub fn persistent(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            persistent: true,
            conn: None,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sends `frame` and returns the decoded response. On any I/O failure
    /// the held connection (if persistent) is dropped so the next call
    /// reconnects.
    pub fn exchange(&mut self, frame: &RequestFrame) -> Result<ResponseFrame, ComputeLinkError> {
        let result = self.exchange_inner(frame);
        if result.is_err() {
            self.conn = None;
        }
        result
    }

    fn exchange_inner(&mut self, frame: &RequestFrame) -> Result<ResponseFrame, ComputeLinkError> {
        let stream = self.connection()?;
        stream.write_all(&frame.to_bytes())?;

        let mut buf = [0u8; RESPONSE_FRAME_SIZE];
        stream.read_exact(&mut buf)?;
        Ok(ResponseFrame::from_bytes(&buf)?)
    }

    fn connection(&mut self) -> std::io::Result<&mut UnixStream> {
        if !self.persistent {
            self.conn = Some(UnixStream::connect(&self.socket_path)?);
            return Ok(self.conn.as_mut().unwrap());
        }

        let reusable = self
            .conn
            .as_ref()
            .map(|s| getsockopt(s, SocketError).map(|errno| errno == 0).unwrap_or(false))
            .unwrap_or(false);

        if !reusable {
            self.conn = Some(UnixStream::connect(&self.socket_path)?);
        }
        Ok(self.conn.as_mut().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crqa_protocol::SIGNAL_LEN;
    use std::io::{Read as _, Write as _};
    use std::os::unix::net::UnixListener;
    use std::thread;

    fn echo_server(listener: UnixListener) {
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut req = vec![0u8; std::mem::size_of::<RequestFrame>()];
                if stream.read_exact(&mut req).is_ok() {
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
                    let _ = stream.write_all(&response.to_bytes());
                }
            }
        });
    }

    #[test]
    fn transient_link_round_trips_one_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crqa.sock");
        let listener = UnixListener::bind(&path).unwrap();
        echo_server(listener);

        let mut link = ComputeLink::transient(&path);
        let frame = RequestFrame::new(0.15, [0.0; SIGNAL_LEN], [0.0; SIGNAL_LEN], 1, true);
        let response = link.exchange(&frame).unwrap();
        assert_eq!(response.epsilon, 1.0);
        assert_eq!(response.max_diag_line, 2.0);
    }

    #[test]
    fn exchange_against_missing_server_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such.sock");
        let mut link = ComputeLink::transient(&path);
        let frame = RequestFrame::new(0.15, [0.0; SIGNAL_LEN], [0.0; SIGNAL_LEN], 1, true);
        assert!(link.exchange(&frame).is_err());
    }
}
