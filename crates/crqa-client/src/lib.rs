//! The Client (§4.5): loads two sample files and drives one complete
//! accelerator cycle end to end, through whichever Driver face `--mode`
//! selects.
//!
//! There is no real kernel module or bus in this workspace (§1: the OS-side
//! driver is an external collaborator, specified only by its user-facing
//! contract), so this binary owns an in-process [`CrqaDevice`] the way a
//! real client would own an open file descriptor onto one: probe it, then
//! drive the register or mapping face to completion.

pub mod config;
pub mod signal_file;

use anyhow::{bail, Context};

use crqa_device::CrqaDevice;
use crqa_driver::register_face::IoctlCommand;
use crqa_driver::{MappingFace, RegisterFace};
use crqa_protocol::MetricBundle;
use devices::pci::PciDevice;

pub use config::{Config, Mode};

pub fn run(config: &Config) -> anyhow::Result<()> {
    tracing::info!(mode = ?config.mode, "loading signals");
    let sig1 = signal_file::load(&config.sig1_path)
        .with_context(|| format!("loading {}", config.sig1_path.display()))?;
    let sig2 = signal_file::load(&config.sig2_path)
        .with_context(|| format!("loading {}", config.sig2_path.display()))?;

    let mut device = CrqaDevice::new(&config.socket_path);
    crqa_driver::probe(device.config_mut())
        .context("accelerator identity probe failed")?;

    let metrics = match config.mode {
        Mode::Register => run_register(&mut device, config, &sig1, &sig2)?,
        Mode::Mapping => run_mapping(&mut device, config, &sig1, &sig2)?,
    };

    print_metrics(&metrics);
    Ok(())
}

fn run_register(
    device: &mut CrqaDevice,
    config: &Config,
    sig1: &crqa_protocol::Signal,
    sig2: &crqa_protocol::Signal,
) -> anyhow::Result<MetricBundle> {
    let mut face = RegisterFace::new(device);
    face.dispatch(IoctlCommand::SetR(config.r));

    for i in 0..crqa_protocol::SIGNAL_LEN as u32 {
        face.dispatch(IoctlCommand::SetSig1Index(i));
        face.dispatch(IoctlCommand::SetSig1Value(sig1[i as usize]));
        face.dispatch(IoctlCommand::SetSig2Index(i));
        face.dispatch(IoctlCommand::SetSig2Value(sig2[i as usize]));
    }
    face.dispatch(IoctlCommand::SetOpcode(config.opcode));

    // Reading epsilon is the compute trigger itself (§4.3.1); every other
    // metric just reads back the value that trigger stored.
    let epsilon = face.dispatch(IoctlCommand::GetEpsilon);
    if epsilon == 0.0 && device.metrics() == MetricBundle::ZERO {
        bail!("compute exchange failed (no compute server reachable?)");
    }

    Ok(MetricBundle {
        epsilon,
        recurrence_rate: face.dispatch(IoctlCommand::GetRecurrenceRate),
        determinism: face.dispatch(IoctlCommand::GetDeterminism),
        laminarity: face.dispatch(IoctlCommand::GetLaminarity),
        trapping_time: face.dispatch(IoctlCommand::GetTrappingTime),
        max_diag_line: face.dispatch(IoctlCommand::GetMaxDiagLine),
        divergence: face.dispatch(IoctlCommand::GetDivergence),
        entropy: face.dispatch(IoctlCommand::GetEntropy),
    })
}

fn run_mapping(
    device: &mut CrqaDevice,
    config: &Config,
    sig1: &crqa_protocol::Signal,
    sig2: &crqa_protocol::Signal,
) -> anyhow::Result<MetricBundle> {
    let mut mapping = MappingFace::map();

    // Reuse whatever `id` is already in the buffer rather than assuming
    // `1`: a fresh device's buffer and `trigger_counter` both start at `0`,
    // and a second run against an already-armed device needs the id it
    // left behind, not a hardcoded guess (§9 "Supplemented features": the
    // original client's `main.c` does the same).
    let id = mapping.read_id(device);

    mapping.write_request(device, config.r, config.opcode, id, sig1, sig2);
    mapping.trigger(device);

    // The synchronous Device Model variant completes the whole cycle
    // inline with the trigger write; pumping once here stands in for the
    // real Driver's blocking wait on its readiness event source.
    device.pump_interrupts(&mut mapping);

    if !mapping.poll_ready() {
        bail!("accelerator did not signal completion (stale trigger or compute exchange failure)");
    }

    Ok(mapping.read_metrics(device))
}

fn print_metrics(metrics: &MetricBundle) {
    println!("epsilon         = {:.6}", metrics.epsilon);
    println!("recurrence_rate = {:.6}", metrics.recurrence_rate);
    println!("determinism     = {:.6}", metrics.determinism);
    println!("laminarity      = {:.6}", metrics.laminarity);
    println!("trapping_time   = {:.6}", metrics.trapping_time);
    println!("max_diag_line   = {:.6}", metrics.max_diag_line);
    println!("divergence      = {:.6}", metrics.divergence);
    println!("entropy         = {:.6}", metrics.entropy);
}
