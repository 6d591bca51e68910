// ad9250-daq/src/session.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! The acquisition session.
//!
//! One session owns the whole device-side lifecycle for a run:
//!
//! ```text
//! open -> enable_channels -> arm -> run(blocks) -> close
//! ```
//!
//! `close()` is the one and only teardown path. It is idempotent and safe
//! after any partial failure, so error branches simply fall through to it
//! instead of carrying their own unwind logic. Buffers are destroyed
//! before their channels are disabled, and the context outlives everything
//! derived from it.

use log::{debug, info, warn};

use crate::{
    adc::{Adc, AdcChannel, AdcDevice, CaptureBuffer},
    capture::CaptureArea,
    errors::{Error, Result},
    stop::StopFlag,
};

/// The ADC endpoint whose channels are always captured.
pub const PRIMARY_DEVICE: &str = "axi-ad9250-hpc-0";
/// The second endpoint on the board; located and validated on every run,
/// captured only on request.
pub const SECONDARY_DEVICE: &str = "axi-ad9250-hpc-1";
/// The streaming channels of each endpoint.
pub const CHANNEL_NAMES: [&str; 2] = ["voltage0", "voltage1"];

/// Default number of blocks captured per run.
pub const DFLT_BLOCKS: usize = 2;
/// Default samples per channel in one block (~4 ms of data).
pub const DFLT_SAMPLES_PER_BLOCK: usize = 1024 * 1024;

// --------------------------------------------------------------------------

/// How degraded conditions (short refills) are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Abort the run on the first short transfer.
    Strict,
    /// Log and continue; the missing tail of the block stays zeroed.
    #[default]
    Permissive,
}

/// Parameters of one acquisition run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the primary device.
    pub primary: String,
    /// Name of the secondary device, if the board carries one.
    pub secondary: Option<String>,
    /// Whether the secondary device's channels are enabled and captured.
    pub capture_secondary: bool,
    /// Blocks captured per run.
    pub blocks: usize,
    /// Samples per channel in one block.
    pub samples_per_block: usize,
    /// Degraded-condition policy.
    pub policy: Policy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary: PRIMARY_DEVICE.to_string(),
            secondary: Some(SECONDARY_DEVICE.to_string()),
            capture_secondary: false,
            blocks: DFLT_BLOCKS,
            samples_per_block: DFLT_SAMPLES_PER_BLOCK,
            policy: Policy::Permissive,
        }
    }
}

/// Where the session stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Context acquired, devices and channels located.
    Open,
    /// Streaming channels enabled.
    Enabled,
    /// Capture buffers created, ready to refill.
    Armed,
    /// All blocks captured.
    Drained,
    /// Buffers destroyed and channels disabled.
    Closed,
}

/// Diagnostics from the last refilled block.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    /// Byte stride between same-channel samples.
    pub step: usize,
    /// Bytes between the first sample and the block end.
    pub block_bytes: usize,
    /// Per-channel samples derived from the two above.
    pub samples: usize,
}

// --------------------------------------------------------------------------

type ChannelOf<A> = <<A as Adc>::Device as AdcDevice>::Channel;
type BufferOf<A> = <<A as Adc>::Device as AdcDevice>::Buffer;

/// One device with its located channels and, once armed, its buffer and
/// capture area.
struct Endpoint<A: Adc> {
    name: String,
    dev: A::Device,
    chans: Vec<ChannelOf<A>>,
    active: bool,
    buf: Option<BufferOf<A>>,
    area: Option<CaptureArea>,
}

impl<A: Adc> Endpoint<A> {
    fn locate(adc: &A, name: &str) -> Result<Self> {
        let dev = adc
            .find_device(name)
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))?;
        let mut chans = Vec::with_capacity(CHANNEL_NAMES.len());
        for chan in CHANNEL_NAMES {
            let ch = dev.find_channel(chan).ok_or_else(|| Error::ChannelNotFound {
                device: name.to_string(),
                channel: chan.to_string(),
            })?;
            chans.push(ch);
        }
        Ok(Self {
            name: name.to_string(),
            dev,
            chans,
            active: false,
            buf: None,
            area: None,
        })
    }

    fn enable(&mut self) {
        for ch in &self.chans {
            ch.enable();
        }
        self.active = true;
    }

    fn disable(&mut self) {
        if self.active {
            for ch in &self.chans {
                ch.disable();
            }
            self.active = false;
        }
    }

    fn arm(&mut self, blocks: usize, samples: usize) -> Result<()> {
        let step = self.dev.sample_size()?;
        self.buf = Some(self.dev.create_buffer(samples)?);
        self.area = Some(CaptureArea::new(blocks, samples * step));
        Ok(())
    }

    fn capture_block(&mut self, index: usize, policy: Policy) -> Result<RunStats> {
        let buf = self.buf.as_mut().ok_or(Error::NotArmed)?;
        let area = self.area.as_mut().ok_or(Error::NotArmed)?;

        let expected = area.block_bytes();
        let got = buf.refill()?;
        if got != expected {
            match policy {
                Policy::Strict => return Err(Error::ShortTransfer { expected, got }),
                Policy::Permissive => {
                    warn!("short refill on {}: {} of {} bytes", self.name, got, expected);
                }
            }
        }

        let view = buf.block(&self.chans[0]);
        let stats = RunStats {
            step: view.step,
            block_bytes: view.data.len(),
            samples: view.sample_count(),
        };
        area.copy_block(index, view.data);
        Ok(stats)
    }
}

// --------------------------------------------------------------------------

/// An acquisition session over an [`Adc`] backend.
pub struct Session<A: Adc> {
    cfg: Config,
    primary: Endpoint<A>,
    secondary: Option<Endpoint<A>>,
    state: State,
    // Declared last: every handle above derives from this context and must
    // be dropped before it.
    adc: A,
}

impl<A: Adc> Session<A> {
    /// Acquires the context and locates every configured device and
    /// channel.
    ///
    /// Lookup failures are fatal: they mean the physical setup does not
    /// match this program.
    pub fn open(adc: A, cfg: Config) -> Result<Self> {
        if adc.device_count() == 0 {
            return Err(Error::NoDevices);
        }
        info!("* Locating streaming devices");
        let primary = Endpoint::locate(&adc, &cfg.primary)?;
        let secondary = match &cfg.secondary {
            Some(name) => Some(Endpoint::locate(&adc, name)?),
            None => None,
        };
        Ok(Self {
            cfg,
            primary,
            secondary,
            state: State::Open,
            adc,
        })
    }

    /// The session's lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The run parameters this session was opened with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Enables the streaming channels used for this run: both channels of
    /// the primary device, plus the secondary's when configured.
    pub fn enable_channels(&mut self) -> Result<()> {
        if self.state != State::Open {
            return Ok(());
        }
        info!("* Enabling streaming channels");
        self.primary.enable();
        if self.cfg.capture_secondary {
            match self.secondary.as_mut() {
                Some(sec) => sec.enable(),
                None => warn!("secondary capture requested but no secondary device configured"),
            }
        }
        self.state = State::Enabled;
        Ok(())
    }

    /// Creates the capture buffers and their host-side areas.
    ///
    /// On failure the session is left in a state where [`close`](Self::close)
    /// releases whatever was already acquired.
    pub fn arm(&mut self) -> Result<()> {
        if matches!(self.state, State::Armed | State::Drained | State::Closed) {
            return Ok(());
        }
        let (blocks, samples) = (self.cfg.blocks, self.cfg.samples_per_block);
        self.primary.arm(blocks, samples)?;
        if self.cfg.capture_secondary {
            if let Some(sec) = self.secondary.as_mut() {
                sec.arm(blocks, samples)?;
            }
        }
        self.state = State::Armed;
        Ok(())
    }

    /// Captures every configured block, copying each one into its capture
    /// area as the hardware completes it.
    ///
    /// The stop flag is checked between refills; a refill in flight still
    /// blocks until the hardware completes it, with no timeout.
    pub fn run(&mut self, stop: &StopFlag) -> Result<RunStats> {
        if self.state != State::Armed {
            return Err(Error::NotArmed);
        }
        let mut last = RunStats::default();
        for index in 0..self.cfg.blocks {
            if stop.is_set() {
                info!("stop requested before block {}", index);
                return Err(Error::Interrupted);
            }
            last = self.primary.capture_block(index, self.cfg.policy)?;
            debug!(
                "block {}: {} bytes, step {}",
                index, last.block_bytes, last.step
            );
            if let Some(sec) = self.secondary.as_mut() {
                if sec.buf.is_some() {
                    sec.capture_block(index, self.cfg.policy)?;
                }
            }
        }
        self.state = State::Drained;

        if last.samples != self.cfg.samples_per_block {
            warn!(
                "refill produced {} samples per channel, expected {}",
                last.samples, self.cfg.samples_per_block
            );
        }
        Ok(last)
    }

    /// Tears the device side down: buffers first, channels second. The
    /// context itself is destroyed when the session is dropped.
    ///
    /// Safe to call any number of times and after any partial failure;
    /// every step is guarded by the state it acts on.
    pub fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        info!("* Destroying capture buffers");
        self.primary.buf = None;
        if let Some(sec) = self.secondary.as_mut() {
            sec.buf = None;
        }
        info!("* Disabling streaming channels");
        self.primary.disable();
        if let Some(sec) = self.secondary.as_mut() {
            sec.disable();
        }
        self.state = State::Closed;
    }

    /// The primary device's assembled capture area, once armed.
    pub fn capture(&self) -> Option<&CaptureArea> {
        self.primary.area.as_ref()
    }

    /// The secondary device's capture area, when secondary capture ran.
    pub fn secondary_capture(&self) -> Option<&CaptureArea> {
        self.secondary.as_ref()?.area.as_ref()
    }
}

impl<A: Adc> Drop for Session<A> {
    fn drop(&mut self) {
        self.close();
    }
}

// --------------------------------------------------------------------------
