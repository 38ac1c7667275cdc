//! The long-lived process hosting the CRQA Kernel: accepts one client at a
//! time over a Unix domain socket, decodes fixed-size Request frames,
//! invokes the Kernel, and writes fixed-size Response frames back.

pub mod config;
pub mod wake;

use std::fs;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};

pub use config::Config;

use crqa_protocol::{RequestFrame, ResponseFrame, REQUEST_FRAME_SIZE};

/// Binds the listening socket (removing a stale path first, matching the
/// reference server's `unlink` before `bind`) and serves sessions forever.
pub fn run(config: &Config) -> anyhow::Result<()> {
    if config.socket_path.exists() {
        fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)?;
    tracing::info!(path = %config.socket_path.display(), "listening");

    loop {
        let (stream, _) = listener.accept()?;
        tracing::info!("accepted connection");
        if let Err(err) = serve_session(stream, config.notify) {
            tracing::warn!(error = %err, "session ended");
        }
    }
}

/// Serves one client to completion: an optional one-shot ancillary-fd
/// handshake, then a loop of Request/Response exchanges until the peer
/// disconnects or sends a malformed frame.
fn serve_session(mut stream: UnixStream, notify: bool) -> anyhow::Result<()> {
    use std::os::fd::AsRawFd;

    let wake_handle = if notify {
        wake::recv_wake_handle(stream.as_raw_fd())?
    } else {
        None
    };

    let mut buf = vec![0u8; REQUEST_FRAME_SIZE];
    loop {
        match stream.read_exact(&mut buf) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::debug!("peer closed session");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }

        let frame = RequestFrame::from_bytes(&buf)?;
        if !frame.is_ready() {
            continue;
        }

        let metrics = crqa_kernel::compute(frame.r, &frame.sig1, &frame.sig2);
        let response = ResponseFrame::from(metrics);
        stream.write_all(&response.to_bytes())?;

        if let Some(handle) = &wake_handle {
            wake::notify(handle)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn one_request_yields_one_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crqa.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            serve_session(stream, false).unwrap();
        });

        let mut client = UnixStream::connect(&path).unwrap();
        let frame = RequestFrame::new(0.15, [1.0; 512], [1.0; 512], 1, true);
        client.write_all(&frame.to_bytes()).unwrap();

        let mut buf = vec![0u8; crqa_protocol::wire::RESPONSE_FRAME_SIZE];
        client.read_exact(&mut buf).unwrap();
        let response = ResponseFrame::from_bytes(&buf).unwrap();
        assert_eq!(response.epsilon, response.determinism);

        drop(client);
        server.join().unwrap();
    }

    #[test]
    fn not_ready_frame_gets_no_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crqa.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            serve_session(stream, false).unwrap();
        });

        let mut client = UnixStream::connect(&path).unwrap();
        let not_ready = RequestFrame::new(0.15, [0.0; 512], [0.0; 512], 0, false);
        client.write_all(&not_ready.to_bytes()).unwrap();
        let ready = RequestFrame::new(0.15, [0.0; 512], [0.0; 512], 1, true);
        client.write_all(&ready.to_bytes()).unwrap();

        let mut buf = vec![0u8; crqa_protocol::wire::RESPONSE_FRAME_SIZE];
        client.read_exact(&mut buf).unwrap();
        ResponseFrame::from_bytes(&buf).unwrap();

        drop(client);
        server.join().unwrap();
    }
}
