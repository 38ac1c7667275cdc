use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Which Driver face to drive: per-field register programming, or the
/// shared-buffer single-shot trigger (§4.4, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Register,
    Mapping,
}

/// Loads two sample files and drives one complete request/response cycle
/// against the accelerator.
#[derive(Debug, Parser)]
#[command(name = "crqa-client", about = "CRQA accelerator test harness")]
pub struct Config {
    /// Path to the first signal file. Overrides the built-in default.
    #[arg(default_value = "signal1.txt")]
    pub sig1_path: PathBuf,

    /// Path to the second signal file. Overrides the built-in default.
    #[arg(default_value = "signal2.txt")]
    pub sig2_path: PathBuf,

    /// Which Driver face to exercise.
    #[arg(long, value_enum, default_value_t = Mode::Mapping)]
    pub mode: Mode,

    /// Recurrence threshold `R`.
    #[arg(long, default_value_t = 0.15)]
    pub r: f64,

    /// Opcode written alongside the signals. Currently opaque to the
    /// Kernel; any nonzero value exercises the same path.
    #[arg(long, default_value_t = 1)]
    pub opcode: u32,

    /// Filesystem path for the Compute Server's Unix domain socket.
    #[arg(long, env = "CRQA_SOCKET_PATH", default_value = crqa_protocol::constants::DEFAULT_SOCKET_PATH)]
    pub socket_path: PathBuf,
}
