// ad9250-daq/src/sim.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Deterministic in-memory backends for the hardware seams.
//!
//! [`SimLines`] stands in for the GPIO character device and records every
//! operation, so protocol tests can assert ordering. [`SimAdc`] stands in
//! for the IIO stack: every refill of a simulated buffer fills the block
//! with the refill index as the sample value, which makes capture-area
//! assembly checkable byte for byte. Both are also used for `--sim` dry
//! runs of the full acquisition sequence.

use std::{cell::RefCell, rc::Rc};

use crate::{
    adc::{Adc, AdcChannel, AdcDevice, BlockView, CaptureBuffer},
    errors::{Error, Result},
    gpio::{LineAccess, MAX_LINES},
};

/// Bytes per sample of the simulated converter (int16, like the AD9250).
pub const SIM_SAMPLE_BYTES: usize = 2;

// --------------------------------------------------------------------------

/// One recorded line operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOp {
    /// A bulk output request.
    Set {
        /// Line offsets, in request order.
        offsets: Vec<u32>,
        /// Levels driven, one per offset.
        values: Vec<u8>,
    },
    /// A bulk input request.
    Get {
        /// Line offsets, in request order.
        offsets: Vec<u32>,
    },
}

/// A simulated array of [`MAX_LINES`] GPIO lines.
#[derive(Debug, Default)]
pub struct SimLines {
    levels: RefCell<Vec<u8>>,
    ops: RefCell<Vec<LineOp>>,
}

impl SimLines {
    /// A fresh line array, all lines low.
    pub fn new() -> Self {
        Self {
            levels: RefCell::new(vec![0; MAX_LINES as usize]),
            ops: RefCell::new(Vec::new()),
        }
    }

    /// Current level of one line.
    pub fn level(&self, offset: u32) -> u8 {
        self.levels.borrow()[offset as usize]
    }

    /// Every operation performed so far, oldest first.
    pub fn ops(&self) -> Vec<LineOp> {
        self.ops.borrow().clone()
    }

    /// Forgets the recorded operations, keeping the line levels.
    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }
}

impl LineAccess for SimLines {
    fn set_lines(&self, offsets: &[u32], values: &[u8]) -> Result<()> {
        let mut levels = self.levels.borrow_mut();
        for (&off, &val) in offsets.iter().zip(values) {
            levels[off as usize] = val & 0x1;
        }
        self.ops.borrow_mut().push(LineOp::Set {
            offsets: offsets.to_vec(),
            values: values.to_vec(),
        });
        Ok(())
    }

    fn get_lines(&self, offsets: &[u32]) -> Result<Vec<u8>> {
        let levels = self.levels.borrow();
        let out = offsets.iter().map(|&off| levels[off as usize]).collect();
        self.ops.borrow_mut().push(LineOp::Get { offsets: offsets.to_vec() });
        Ok(out)
    }
}

// --------------------------------------------------------------------------

/// Counters shared by a [`SimAdc`] and everything derived from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Channel enable calls.
    pub enables: usize,
    /// Channel disable calls.
    pub disables: usize,
    /// Buffers created.
    pub buffers_created: usize,
    /// Buffers destroyed.
    pub buffers_destroyed: usize,
    /// Refill calls across all buffers.
    pub refills: usize,
}

/// Cloneable handle onto a [`SimAdc`]'s counters, usable after the context
/// itself has been handed to a session.
#[derive(Debug, Clone, Default)]
pub struct SimStatsHandle {
    inner: Rc<RefCell<SimStats>>,
}

impl SimStatsHandle {
    /// Snapshot of the counters.
    pub fn get(&self) -> SimStats {
        *self.inner.borrow()
    }
}

// --------------------------------------------------------------------------

#[derive(Debug)]
struct DevShared {
    name: String,
    channels: Vec<String>,
    enabled: RefCell<Vec<bool>>,
    fail_next_buffer: RefCell<bool>,
    short_refill: RefCell<Option<usize>>,
    stats: Rc<RefCell<SimStats>>,
}

/// A simulated acquisition context.
///
/// Every device carries a `voltage0` and a `voltage1` channel delivering
/// interleaved int16 samples.
#[derive(Debug)]
pub struct SimAdc {
    devices: Vec<Rc<DevShared>>,
    stats: Rc<RefCell<SimStats>>,
}

impl SimAdc {
    /// A context exposing one device per name given.
    pub fn new(names: &[&str]) -> Self {
        let stats = Rc::new(RefCell::new(SimStats::default()));
        let devices = names
            .iter()
            .map(|&name| {
                Rc::new(DevShared {
                    name: name.to_string(),
                    channels: vec!["voltage0".to_string(), "voltage1".to_string()],
                    enabled: RefCell::new(vec![false, false]),
                    fail_next_buffer: RefCell::new(false),
                    short_refill: RefCell::new(None),
                    stats: stats.clone(),
                })
            })
            .collect();
        Self { devices, stats }
    }

    /// A context with no devices at all.
    pub fn empty() -> Self {
        Self::new(&[])
    }

    /// Handle onto the shared counters.
    pub fn stats(&self) -> SimStatsHandle {
        SimStatsHandle { inner: self.stats.clone() }
    }
}

impl Adc for SimAdc {
    type Device = SimDevice;

    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn find_device(&self, name: &str) -> Option<SimDevice> {
        self.devices
            .iter()
            .find(|dev| dev.name == name)
            .map(|dev| SimDevice { shared: dev.clone() })
    }
}

// --------------------------------------------------------------------------

/// A device handle from a [`SimAdc`].
#[derive(Debug, Clone)]
pub struct SimDevice {
    shared: Rc<DevShared>,
}

impl SimDevice {
    /// Makes the next `create_buffer` call fail, to exercise the
    /// allocation-failure path.
    pub fn fail_next_buffer(&self) {
        *self.shared.fail_next_buffer.borrow_mut() = true;
    }

    /// Makes every refill report (and deliver) only `bytes` bytes.
    pub fn set_short_refill(&self, bytes: Option<usize>) {
        *self.shared.short_refill.borrow_mut() = bytes;
    }
}

impl AdcDevice for SimDevice {
    type Channel = SimChannel;
    type Buffer = SimBuffer;

    fn name(&self) -> Option<String> {
        Some(self.shared.name.clone())
    }

    fn find_channel(&self, name: &str) -> Option<SimChannel> {
        let index = self.shared.channels.iter().position(|ch| ch == name)?;
        Some(SimChannel { shared: self.shared.clone(), index })
    }

    fn sample_size(&self) -> Result<usize> {
        let enabled = self.shared.enabled.borrow().iter().filter(|&&on| on).count();
        Ok(enabled * SIM_SAMPLE_BYTES)
    }

    fn create_buffer(&self, samples: usize) -> Result<SimBuffer> {
        if *self.shared.fail_next_buffer.borrow() {
            *self.shared.fail_next_buffer.borrow_mut() = false;
            return Err(Error::BufferAlloc(self.shared.name.clone()));
        }
        // Snapshot of the channels enabled at creation time, like the
        // hardware buffer layout.
        let enabled: Vec<usize> = self
            .shared
            .enabled
            .borrow()
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(i))
            .collect();
        if enabled.is_empty() {
            return Err(Error::BufferAlloc(self.shared.name.clone()));
        }
        self.shared.stats.borrow_mut().buffers_created += 1;
        let step = enabled.len() * SIM_SAMPLE_BYTES;
        Ok(SimBuffer {
            shared: self.shared.clone(),
            enabled,
            step,
            data: vec![0; samples * step],
            fills: 0,
        })
    }
}

// --------------------------------------------------------------------------

/// A channel handle from a [`SimDevice`].
#[derive(Debug, Clone)]
pub struct SimChannel {
    shared: Rc<DevShared>,
    index: usize,
}

impl AdcChannel for SimChannel {
    fn enable(&self) {
        self.shared.enabled.borrow_mut()[self.index] = true;
        self.shared.stats.borrow_mut().enables += 1;
    }

    fn disable(&self) {
        self.shared.enabled.borrow_mut()[self.index] = false;
        self.shared.stats.borrow_mut().disables += 1;
    }

    fn is_enabled(&self) -> bool {
        self.shared.enabled.borrow()[self.index]
    }
}

// --------------------------------------------------------------------------

/// A capture buffer from a [`SimDevice`].
///
/// Refill `i` (zero-based) fills the whole block with the int16 value `i`,
/// so assembled capture areas are predictable byte for byte.
#[derive(Debug)]
pub struct SimBuffer {
    shared: Rc<DevShared>,
    enabled: Vec<usize>,
    step: usize,
    data: Vec<u8>,
    fills: usize,
}

impl CaptureBuffer for SimBuffer {
    type Channel = SimChannel;

    fn refill(&mut self) -> Result<usize> {
        let value = self.fills as i16;
        for sample in self.data.chunks_exact_mut(SIM_SAMPLE_BYTES) {
            sample.copy_from_slice(&value.to_le_bytes());
        }
        self.fills += 1;
        self.shared.stats.borrow_mut().refills += 1;

        let full = self.data.len();
        Ok(match *self.shared.short_refill.borrow() {
            Some(short) => short.min(full),
            None => full,
        })
    }

    fn block(&self, chan: &SimChannel) -> BlockView<'_> {
        let slot = self
            .enabled
            .iter()
            .position(|&idx| idx == chan.index)
            .unwrap_or(0);
        let first = slot * SIM_SAMPLE_BYTES;
        let end = match *self.shared.short_refill.borrow() {
            Some(short) => short.min(self.data.len()),
            None => self.data.len(),
        };
        BlockView {
            data: &self.data[first.min(end)..end],
            step: self.step,
        }
    }
}

impl Drop for SimBuffer {
    fn drop(&mut self) {
        self.shared.stats.borrow_mut().buffers_destroyed += 1;
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refill_counts_up() {
        let adc = SimAdc::new(&["dev"]);
        let dev = adc.find_device("dev").unwrap();
        let ch = dev.find_channel("voltage0").unwrap();
        ch.enable();

        let mut buf = dev.create_buffer(4).unwrap();
        assert_eq!(buf.refill().unwrap(), 8);
        assert!(buf.block(&ch).data.iter().all(|&b| b == 0));

        buf.refill().unwrap();
        let view = buf.block(&ch);
        assert_eq!(view.step, SIM_SAMPLE_BYTES);
        assert_eq!(view.sample_count(), 4);
        for sample in view.data.chunks_exact(2) {
            assert_eq!(i16::from_le_bytes([sample[0], sample[1]]), 1);
        }
    }

    #[test]
    fn interleaving_two_channels() {
        let adc = SimAdc::new(&["dev"]);
        let dev = adc.find_device("dev").unwrap();
        let ch0 = dev.find_channel("voltage0").unwrap();
        let ch1 = dev.find_channel("voltage1").unwrap();
        ch0.enable();
        ch1.enable();

        let mut buf = dev.create_buffer(16).unwrap();
        buf.refill().unwrap();

        let v0 = buf.block(&ch0);
        let v1 = buf.block(&ch1);
        assert_eq!(v0.step, 2 * SIM_SAMPLE_BYTES);
        assert_eq!(v0.sample_count(), 16);
        assert_eq!(v1.data.len(), v0.data.len() - SIM_SAMPLE_BYTES);
    }

    #[test]
    fn buffer_needs_an_enabled_channel() {
        let adc = SimAdc::new(&["dev"]);
        let dev = adc.find_device("dev").unwrap();
        assert!(matches!(dev.create_buffer(4), Err(Error::BufferAlloc(_))));
    }

    #[test]
    fn stats_track_lifecycle() {
        let adc = SimAdc::new(&["dev"]);
        let stats = adc.stats();
        let dev = adc.find_device("dev").unwrap();
        let ch = dev.find_channel("voltage0").unwrap();
        ch.enable();
        {
            let mut buf = dev.create_buffer(4).unwrap();
            buf.refill().unwrap();
        }
        ch.disable();

        let s = stats.get();
        assert_eq!(s.enables, 1);
        assert_eq!(s.disables, 1);
        assert_eq!(s.buffers_created, 1);
        assert_eq!(s.buffers_destroyed, 1);
        assert_eq!(s.refills, 1);
    }
}
