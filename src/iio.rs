// ad9250-daq/src/iio.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! The IIO-backed implementation of the acquisition seam.
//!
//! A thin wrapper over _libiio_'s local backend, covering exactly what the
//! acquisition session needs: context creation, device/channel lookup by
//! name, channel enablement, and DMA buffer refill with raw access to the
//! interleaved block.
//!
//! None of these handles are `Send`: the underlying library gives no
//! thread-safety guarantees, and the whole program is single-threaded by
//! design.

use std::{ffi::CString, slice};

use libiio_sys as ffi;
use nix::errno::Errno;

use crate::{
    adc::{Adc, AdcChannel, AdcDevice, BlockView, CaptureBuffer},
    errors::{Error, Result},
};

fn sys_result<T>(ret: i32, result: T) -> Result<T> {
    if ret < 0 {
        Err(Errno::from_i32(-ret).into())
    }
    else {
        Ok(result)
    }
}

// --------------------------------------------------------------------------

/// The local IIO context.
pub struct IioAdc {
    ctx: *mut ffi::iio_context,
}

impl IioAdc {
    /// Creates the local context.
    pub fn new() -> Result<Self> {
        let ctx = unsafe { ffi::iio_create_local_context() };
        if ctx.is_null() {
            return Err(Error::NoContext);
        }
        Ok(Self { ctx })
    }
}

impl Drop for IioAdc {
    fn drop(&mut self) {
        unsafe { ffi::iio_context_destroy(self.ctx) };
    }
}

impl Adc for IioAdc {
    type Device = IioDevice;

    fn device_count(&self) -> usize {
        unsafe { ffi::iio_context_get_devices_count(self.ctx) as usize }
    }

    fn find_device(&self, name: &str) -> Option<IioDevice> {
        let name = CString::new(name).ok()?;
        let dev = unsafe { ffi::iio_context_find_device(self.ctx, name.as_ptr()) };
        if dev.is_null() {
            None
        }
        else {
            Some(IioDevice { dev })
        }
    }
}

// --------------------------------------------------------------------------

/// An IIO device handle.
///
/// Not independently destroyed; released with the context.
pub struct IioDevice {
    dev: *mut ffi::iio_device,
}

impl AdcDevice for IioDevice {
    type Channel = IioChannel;
    type Buffer = IioBuffer;

    fn name(&self) -> Option<String> {
        let pstr = unsafe { ffi::iio_device_get_name(self.dev) };
        if pstr.is_null() {
            None
        }
        else {
            let name = unsafe { std::ffi::CStr::from_ptr(pstr) };
            Some(name.to_str().unwrap_or_default().to_string())
        }
    }

    fn find_channel(&self, name: &str) -> Option<IioChannel> {
        let name = CString::new(name).ok()?;
        // Input channels only; this program never drives a DAC.
        let chan = unsafe { ffi::iio_device_find_channel(self.dev, name.as_ptr(), false) };
        if chan.is_null() {
            None
        }
        else {
            Some(IioChannel { chan })
        }
    }

    fn sample_size(&self) -> Result<usize> {
        let ret = unsafe { ffi::iio_device_get_sample_size(self.dev) };
        sys_result(ret as i32, ret as usize)
    }

    fn create_buffer(&self, samples: usize) -> Result<IioBuffer> {
        let buf = unsafe { ffi::iio_device_create_buffer(self.dev, samples, false) };
        if buf.is_null() {
            Err(Error::BufferAlloc(self.name().unwrap_or_default()))
        }
        else {
            Ok(IioBuffer { buf })
        }
    }
}

// --------------------------------------------------------------------------

/// An IIO channel handle.
pub struct IioChannel {
    chan: *mut ffi::iio_channel,
}

impl AdcChannel for IioChannel {
    fn enable(&self) {
        unsafe { ffi::iio_channel_enable(self.chan) };
    }

    fn disable(&self) {
        unsafe { ffi::iio_channel_disable(self.chan) };
    }

    fn is_enabled(&self) -> bool {
        unsafe { ffi::iio_channel_is_enabled(self.chan) }
    }
}

// --------------------------------------------------------------------------

/// A DMA-backed IIO capture buffer.
pub struct IioBuffer {
    buf: *mut ffi::iio_buffer,
}

impl CaptureBuffer for IioBuffer {
    type Channel = IioChannel;

    fn refill(&mut self) -> Result<usize> {
        let ret = unsafe { ffi::iio_buffer_refill(self.buf) };
        sys_result(ret as i32, ret as usize)
    }

    fn block(&self, chan: &IioChannel) -> BlockView<'_> {
        unsafe {
            let first = ffi::iio_buffer_first(self.buf, chan.chan) as *const u8;
            let end = ffi::iio_buffer_end(self.buf) as *const u8;
            let step = ffi::iio_buffer_step(self.buf) as usize;
            let len = end.offset_from(first) as usize;
            BlockView {
                data: slice::from_raw_parts(first, len),
                step,
            }
        }
    }
}

impl Drop for IioBuffer {
    fn drop(&mut self) {
        unsafe { ffi::iio_buffer_destroy(self.buf) };
    }
}
