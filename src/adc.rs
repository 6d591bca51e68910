// ad9250-daq/src/adc.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! The acquisition-hardware seam.
//!
//! The session logic talks to the ADC subsystem through these traits. On
//! the target they are backed by the IIO library (the `iio` feature); in
//! tests and dry runs by the deterministic [`sim`](crate::sim) backend.
//!
//! The object graph mirrors the underlying library: a context enumerates
//! devices, a device owns named channels and creates DMA-backed capture
//! buffers, and a buffer delivers one interleaved block per refill.
//! Channels must be enabled before a buffer is created, and a buffer must
//! be dropped before its channels are disabled.

use crate::errors::Result;

/// The acquisition context, owner of every device handle derived from it.
///
/// Implementations destroy the underlying context when dropped; the
/// session keeps the context alive past every derived handle.
pub trait Adc {
    /// Device handle type produced by this context.
    type Device: AdcDevice;

    /// Number of devices the context discovered.
    fn device_count(&self) -> usize;

    /// Looks a device up by exact name.
    fn find_device(&self, name: &str) -> Option<Self::Device>;
}

/// One physical ADC endpoint within the context.
pub trait AdcDevice {
    /// Channel handle type of this device.
    type Channel: AdcChannel;
    /// Capture-buffer type of this device.
    type Buffer: CaptureBuffer<Channel = Self::Channel>;

    /// The device name, if it has one.
    fn name(&self) -> Option<String>;

    /// Looks an input channel up by exact name.
    fn find_channel(&self, name: &str) -> Option<Self::Channel>;

    /// Bytes of one interleaved scan across the currently enabled channels.
    fn sample_size(&self) -> Result<usize>;

    /// Creates a capture buffer holding `samples` samples per enabled
    /// channel. Fails if no channel is enabled.
    fn create_buffer(&self, samples: usize) -> Result<Self::Buffer>;
}

/// A named analog input line on a device.
pub trait AdcChannel {
    /// Marks the channel for capture. Takes effect when a buffer is
    /// created.
    fn enable(&self);

    /// Removes the channel from capture.
    fn disable(&self);

    /// Whether the channel is currently marked for capture.
    fn is_enabled(&self) -> bool;
}

/// A fixed-capacity, DMA-backed capture buffer.
pub trait CaptureBuffer {
    /// The channel type this buffer captures from.
    type Channel;

    /// Blocks until one full capacity of interleaved samples has been
    /// transferred; returns the byte count the hardware reported.
    ///
    /// There is no timeout: if the trigger never arrives this call never
    /// returns.
    fn refill(&mut self) -> Result<usize>;

    /// View of the block delivered by the last refill, starting at the
    /// first sample of `chan` and running to the end of the block.
    fn block(&self, chan: &Self::Channel) -> BlockView<'_>;
}

// --------------------------------------------------------------------------

/// One refilled block: the raw interleaved bytes and the stride, in bytes,
/// between two consecutive samples of the same channel.
#[derive(Debug, Clone, Copy)]
pub struct BlockView<'a> {
    /// Interleaved sample bytes from the requested channel's first sample
    /// to the end of the block.
    pub data: &'a [u8],
    /// Byte stride between same-channel samples.
    pub step: usize,
}

impl<'a> BlockView<'a> {
    /// Number of per-channel samples in the block, derived from the
    /// pointer distance and the stride.
    pub fn sample_count(&self) -> usize {
        if self.step == 0 {
            0
        }
        else {
            self.data.len() / self.step
        }
    }
}

// --------------------------------------------------------------------------
