// ad9250-daq/src/bin/ad9250_daq.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//

//! Single-shot AD9250 acquisition run.
//!
//! Programs the trigger-delay registers over the GPIO character device,
//! raises the run-enable word in the memory-mapped AXI GPIO block, streams
//! the configured number of DMA blocks from the primary converter, and
//! writes the raw capture to a binary file.
//!
//! With `--sim` the whole sequence runs against the in-memory backends,
//! which is useful for exercising the pipeline on a machine without the
//! hardware.

use std::{
    path::{Path, PathBuf},
    process,
};

use anyhow::{Context as _, Result};
use clap::{crate_version, Arg, Command};
use log::{error, info, warn};

use ad9250_daq as daq;

use ad9250_daq::{
    capture::DFLT_OUTPUT,
    gpio::{LineAccess, DFLT_CHIP},
    regmap::{RegisterWindow, GPIO0_DATA_OFFSET, GPIO1_DATA_OFFSET},
    session::{Config, Policy, Session, DFLT_BLOCKS, DFLT_SAMPLES_PER_BLOCK},
    sim::{SimAdc, SimLines},
    stop::StopFlag,
    trigger::{delay_us, TriggerController, DFLT_COMPENSATION, DFLT_TRIGGER_DELAY},
    Adc,
};

/// Run-enable word for GPIO bank 1, raised once the channels are enabled.
const RUN_ENABLE: u32 = 0x11;

// --------------------------------------------------------------------------

struct Opts {
    output: PathBuf,
    blocks: usize,
    samples: usize,
    delay: i16,
    compensation: i16,
    chip: String,
    strict: bool,
    secondary: bool,
    sim: bool,
}

fn cli() -> Command<'static> {
    Command::new("ad9250-daq")
        .version(crate_version!())
        .about("AD9250 FMC streaming acquisition with GPIO-programmed trigger delays")
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .takes_value(true)
                .default_value(DFLT_OUTPUT)
                .help("Output file for the raw capture"),
        )
        .arg(
            Arg::new("blocks")
                .short('b')
                .long("blocks")
                .takes_value(true)
                .help("Number of buffer blocks to capture"),
        )
        .arg(
            Arg::new("samples")
                .short('n')
                .long("samples")
                .takes_value(true)
                .help("Samples per channel in one block"),
        )
        .arg(
            Arg::new("delay")
                .short('t')
                .long("delay")
                .takes_value(true)
                .allow_hyphen_values(true)
                .help("Trigger delay for registers 1 and 3, in ticks"),
        )
        .arg(
            Arg::new("compensation")
                .short('c')
                .long("compensation")
                .takes_value(true)
                .allow_hyphen_values(true)
                .help("Compensation delay for register 2, in ticks"),
        )
        .arg(
            Arg::new("chip")
                .long("chip")
                .takes_value(true)
                .default_value(DFLT_CHIP)
                .help("GPIO character device carrying the trigger lines"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Abort on short transfers instead of logging them"),
        )
        .arg(
            Arg::new("secondary")
                .long("secondary")
                .help("Also enable and capture the secondary device"),
        )
        .arg(
            Arg::new("sim")
                .long("sim")
                .help("Run against the simulated backends, no hardware access"),
        )
}

impl Opts {
    fn from_args() -> Self {
        let args = cli().get_matches();
        Self {
            output: PathBuf::from(args.value_of("output").unwrap_or(DFLT_OUTPUT)),
            blocks: args
                .value_of("blocks")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DFLT_BLOCKS),
            samples: args
                .value_of("samples")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DFLT_SAMPLES_PER_BLOCK),
            delay: args
                .value_of("delay")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DFLT_TRIGGER_DELAY),
            compensation: args
                .value_of("compensation")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DFLT_COMPENSATION),
            chip: args.value_of("chip").unwrap_or(DFLT_CHIP).to_string(),
            strict: args.is_present("strict"),
            secondary: args.is_present("secondary"),
            sim: args.is_present("sim"),
        }
    }
}

// --------------------------------------------------------------------------

fn run() -> Result<()> {
    let opts = Opts::from_args();

    let stop = StopFlag::new();
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || {
        warn!("stop requested, waiting for the current block to finish...");
        handler_flag.request();
    })
    .context("could not install the interrupt handler")?;

    if opts.sim {
        info!("simulated run, no hardware is touched");
        let adc = SimAdc::new(&[daq::PRIMARY_DEVICE, daq::SECONDARY_DEVICE]);
        acquire(adc, SimLines::new(), RegisterWindow::anon()?, &stop, &opts)
    }
    else {
        info!("trigger lines on {}", opts.chip);
        run_hardware(&stop, &opts)
    }
}

#[cfg(feature = "iio")]
fn run_hardware(stop: &StopFlag, opts: &Opts) -> Result<()> {
    let lines = daq::gpio::ChipLines::new(&opts.chip);
    let window = RegisterWindow::open(daq::regmap::GPIO_BASE_ADDRESS)
        .context("could not map the AXI GPIO register window")?;
    let adc = daq::iio::IioAdc::new().context("could not acquire the IIO context")?;
    acquire(adc, lines, window, stop, opts)
}

#[cfg(not(feature = "iio"))]
fn run_hardware(_stop: &StopFlag, _opts: &Opts) -> Result<()> {
    anyhow::bail!("built without the `iio` feature; only --sim runs are available")
}

/// The acquisition sequence proper, over any pair of backends.
fn acquire<A, L>(
    adc: A,
    lines: L,
    mut window: RegisterWindow,
    stop: &StopFlag,
    opts: &Opts,
) -> Result<()>
where
    A: Adc,
    L: LineAccess,
{
    let trigger = TriggerController::new(lines);
    info!(
        "programming trigger delays: {} ticks, compensation {} ticks",
        opts.delay, opts.compensation
    );
    trigger
        .program_delays(opts.delay, opts.compensation)
        .context("trigger register programming failed")?;

    let cfg = Config {
        capture_secondary: opts.secondary,
        blocks: opts.blocks,
        samples_per_block: opts.samples,
        policy: if opts.strict { Policy::Strict } else { Policy::Permissive },
        ..Config::default()
    };
    let mut session =
        Session::open(adc, cfg).context("could not open the acquisition session")?;
    session.enable_channels()?;

    // Channels are live; raise the run-enable word so the trigger state
    // machine starts feeding the DMA engine.
    window.write32(GPIO1_DATA_OFFSET, RUN_ENABLE);

    session.arm().context("could not arm the capture buffers")?;
    let result = session.run(stop);
    session.close();
    let stats = result.context("acquisition failed")?;

    info!(
        "stride {} bytes, block {} bytes, {} samples per channel",
        stats.step, stats.block_bytes, stats.samples
    );
    let raw = trigger.read_delay()?;
    info!("trigger delay read-back: {} ({:.3} us)", raw, delay_us(raw));
    trigger.disarm()?;
    info!(
        "gpio bank 0: {:#010x}, bank 1: {:#010x}",
        window.read32(GPIO0_DATA_OFFSET),
        window.read32(GPIO1_DATA_OFFSET)
    );

    info!("* Saving data to {}", opts.output.display());
    let area = session
        .capture()
        .context("no capture area was assembled")?;
    area.save(&opts.output)
        .with_context(|| format!("could not write {}", opts.output.display()))?;
    info!("wrote {} bytes to {}", area.len(), opts.output.display());

    if let Some(sec) = session.secondary_capture() {
        let path = secondary_output(&opts.output);
        sec.save(&path)
            .with_context(|| format!("could not write {}", path.display()))?;
        info!("wrote {} bytes to {}", sec.len(), path.display());
    }
    Ok(())
}

/// Output path for the secondary device: `intData.bin` -> `intData1.bin`.
fn secondary_output(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("intData");
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => path.with_file_name(format!("{}1.{}", stem, ext)),
        None => path.with_file_name(format!("{}1", stem)),
    }
}

// --------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        error!("{:#}", err);
        let code = err
            .downcast_ref::<daq::Error>()
            .map_or(1, |e| if e.is_fatal() { 2 } else { 1 });
        process::exit(code);
    }
}
