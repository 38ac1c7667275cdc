use std::path::PathBuf;

use clap::Parser;

use crqa_protocol::constants::DEFAULT_SOCKET_PATH;

/// Long-lived process hosting the CRQA Kernel. Accepts one client
/// connection at a time; additional connection attempts queue on the
/// listen backlog until the current session ends.
#[derive(Debug, Parser)]
#[command(name = "crqa-compute-server", about = "CRQA compute engine")]
pub struct Config {
    /// Filesystem path for the Unix domain socket to listen on.
    #[arg(long, env = "CRQA_SOCKET_PATH", default_value = DEFAULT_SOCKET_PATH)]
    pub socket_path: PathBuf,

    /// Receive a wake handle as an ancillary file descriptor on the first
    /// read of each session and bump it by one after every completed
    /// request, matching the shared-buffer Device Model's notification
    /// mode. Off by default (synchronous register-mode callers never send
    /// a handle).
    #[arg(long)]
    pub notify: bool,
}
