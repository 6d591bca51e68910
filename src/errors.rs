// ad9250-daq/src/errors.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//!
//! Error definitions for the acquisition tool.

use std::io;
use thiserror::Error;

/// The Error type for the acquisition tool.
///
/// Discovery failures (`NoContext`, `NoDevices`, `DeviceNotFound`,
/// `ChannelNotFound`) mean the physical setup does not match expectations
/// and are considered fatal; everything else is recoverable through the
/// normal shutdown path.
#[derive(Error, Debug)]
pub enum Error {
    /// A low-level I/O error
    #[error("{0}")]
    Io(#[from] io::Error),
    /// A low-level Unix-style error
    #[error("{0}")]
    Nix(#[from] nix::Error),
    /// An error from the GPIO character device
    #[error("{0}")]
    Gpio(#[from] gpio_cdev::errors::Error),
    /// The IIO context could not be created
    #[error("no IIO context")]
    NoContext,
    /// The IIO context holds no devices
    #[error("no devices in the IIO context")]
    NoDevices,
    /// A device lookup by exact name failed
    #[error("no device named '{0}'")]
    DeviceNotFound(String),
    /// A channel lookup by exact name failed
    #[error("no channel '{channel}' on device '{device}'")]
    ChannelNotFound {
        /// The device that was searched
        device: String,
        /// The channel name that was requested
        channel: String,
    },
    /// The DMA capture buffer could not be created
    #[error("could not create a capture buffer on '{0}'")]
    BufferAlloc(String),
    /// A GPIO line request exceeded the line-count ceiling of the chip
    #[error("GPIO line range {offset}(+{width}) is out of range")]
    OutOfRange {
        /// First line offset of the rejected request
        offset: u32,
        /// Number of consecutive lines requested
        width: u32,
    },
    /// A buffer refill transferred fewer bytes than one full block
    #[error("short transfer: expected {expected} bytes, got {got}")]
    ShortTransfer {
        /// Expected block size in bytes
        expected: usize,
        /// Bytes actually transferred
        got: usize,
    },
    /// The capture file took fewer bytes than were handed to it
    #[error("short write: expected {expected} bytes, wrote {wrote}")]
    ShortWrite {
        /// Bytes handed to the file
        expected: usize,
        /// Bytes the write accepted
        wrote: usize,
    },
    /// A refill was requested while no buffer is armed
    #[error("no capture buffer is armed")]
    NotArmed,
    /// The operator requested a stop between refills
    #[error("acquisition interrupted")]
    Interrupted,
}

impl Error {
    /// Whether this error indicates a hardware-discovery failure.
    ///
    /// Continuing after one of these would mean operating on handles for
    /// hardware that is not actually there, so the caller should shut down
    /// and exit rather than retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::NoContext
                | Error::NoDevices
                | Error::DeviceNotFound(_)
                | Error::ChannelNotFound { .. }
        )
    }
}

/// The default result type for the acquisition tool.
pub type Result<T> = std::result::Result<T, Error>;

// --------------------------------------------------------------------------
