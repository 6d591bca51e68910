// ad9250-daq/src/gpio.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! GPIO line access.
//!
//! The trigger hardware is wired to consecutive lines of a single GPIO
//! chip. Multi-bit fields (the register address, the 16-bit delay value)
//! are driven by decomposing an integer across consecutive line offsets,
//! LSB first, and requesting all of the lines in one bulk call.
//!
//! The actual line access sits behind the [`LineAccess`] trait so that the
//! protocol logic can run against the kernel character device on the target
//! and against [`sim::SimLines`](crate::sim::SimLines) in tests.

use std::path::{Path, PathBuf};

use gpio_cdev::{Chip, LineRequestFlags};

use crate::errors::{Error, Result};

/// Line-count ceiling of the access layer.
///
/// Requests reaching past this many lines are rejected before any line is
/// touched.
pub const MAX_LINES: u32 = 64;

/// Default GPIO character device on the Zynq carrier.
pub const DFLT_CHIP: &str = "/dev/gpiochip0";

/// Consumer label shown in `gpioinfo` while lines are held.
pub const CONSUMER: &str = "ad9250-daq";

// --------------------------------------------------------------------------

/// Bulk access to GPIO lines by explicit offset list.
///
/// Implementations request every listed line in a single operation; `values`
/// and the returned levels are one byte per line, 0 or 1.
pub trait LineAccess {
    /// Drives the listed lines as outputs with the given levels.
    fn set_lines(&self, offsets: &[u32], values: &[u8]) -> Result<()>;
    /// Reads the listed lines as inputs.
    fn get_lines(&self, offsets: &[u32]) -> Result<Vec<u8>>;
}

impl<L: LineAccess + ?Sized> LineAccess for &L {
    fn set_lines(&self, offsets: &[u32], values: &[u8]) -> Result<()> {
        (**self).set_lines(offsets, values)
    }

    fn get_lines(&self, offsets: &[u32]) -> Result<Vec<u8>> {
        (**self).get_lines(offsets)
    }
}

// --------------------------------------------------------------------------

/// Integer-valued view of a contiguous run of GPIO lines.
#[derive(Debug)]
pub struct Gpio<L: LineAccess> {
    lines: L,
}

impl<L: LineAccess> Gpio<L> {
    /// Creates the view over a line-access backend.
    pub fn new(lines: L) -> Self {
        Self { lines }
    }

    /// Drives the low `width` bits of `value` onto `width` consecutive
    /// lines starting at `offset`, LSB first.
    pub fn set_multiple(&self, offset: u32, width: u32, value: u32) -> Result<()> {
        let offsets = line_range(offset, width)?;
        let values = (0..width).map(|i| ((value >> i) & 0x1) as u8).collect::<Vec<_>>();
        self.lines.set_lines(&offsets, &values)
    }

    /// Reads `width` consecutive lines starting at `offset` and reassembles
    /// them into an integer, LSB first.
    pub fn get_multiple(&self, offset: u32, width: u32) -> Result<u32> {
        let offsets = line_range(offset, width)?;
        let levels = self.lines.get_lines(&offsets)?;
        let mut value = 0u32;
        for (i, level) in levels.iter().enumerate() {
            value |= u32::from(level & 0x1) << i;
        }
        Ok(value)
    }

    /// Single-line convenience form of [`set_multiple`](Self::set_multiple).
    pub fn set_line(&self, offset: u32, value: u8) -> Result<()> {
        self.set_multiple(offset, 1, u32::from(value))
    }
}

fn line_range(offset: u32, width: u32) -> Result<Vec<u32>> {
    match offset.checked_add(width) {
        Some(end) if end <= MAX_LINES => Ok((offset..end).collect()),
        _ => Err(Error::OutOfRange { offset, width }),
    }
}

// --------------------------------------------------------------------------

/// GPIO access through the kernel character device.
///
/// Each call opens the chip, requests the lines, performs the access, and
/// releases everything again, mirroring the one-shot request style the
/// trigger protocol was brought up with. The sysfs interface is deprecated
/// since Linux 4.8; this goes through the ioctl-based character device.
#[derive(Debug, Clone)]
pub struct ChipLines {
    path: PathBuf,
}

impl ChipLines {
    /// Line access on the given GPIO character device.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Line access on [`DFLT_CHIP`].
    pub fn default_chip() -> Self {
        Self::new(DFLT_CHIP)
    }
}

impl LineAccess for ChipLines {
    fn set_lines(&self, offsets: &[u32], values: &[u8]) -> Result<()> {
        let mut chip = Chip::new(&self.path)?;
        let lines = chip.get_lines(offsets)?;
        // Requesting as output with default values already drives the lines;
        // the handle is released on drop.
        let _handle = lines.request(LineRequestFlags::OUTPUT, values, CONSUMER)?;
        Ok(())
    }

    fn get_lines(&self, offsets: &[u32]) -> Result<Vec<u8>> {
        let mut chip = Chip::new(&self.path)?;
        let lines = chip.get_lines(offsets)?;
        let zeros = vec![0u8; offsets.len()];
        let handle = lines.request(LineRequestFlags::INPUT, &zeros, CONSUMER)?;
        Ok(handle.get_values()?)
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimLines;

    #[test]
    fn roundtrip_all_widths() {
        let sim = SimLines::new();
        let gpio = Gpio::new(&sim);

        for width in 1..=32u32 {
            let mask = if width == 32 { u32::MAX } else { (1 << width) - 1 };
            let value = 0xA5A5_5A5Au32 & mask;
            gpio.set_multiple(0, width, value).unwrap();
            assert_eq!(gpio.get_multiple(0, width).unwrap(), value, "width {}", width);

            // Same pattern pushed against the top of the line range.
            let offset = MAX_LINES - width;
            gpio.set_multiple(offset, width, value).unwrap();
            assert_eq!(gpio.get_multiple(offset, width).unwrap(), value);
        }
    }

    #[test]
    fn roundtrip_masks_value() {
        let sim = SimLines::new();
        let gpio = Gpio::new(&sim);

        // Bits above the field width are not driven anywhere.
        gpio.set_multiple(8, 4, 0xFF).unwrap();
        assert_eq!(gpio.get_multiple(8, 4).unwrap(), 0xF);
        assert_eq!(gpio.get_multiple(12, 4).unwrap(), 0);
    }

    #[test]
    fn out_of_range_performs_no_access() {
        let sim = SimLines::new();
        let gpio = Gpio::new(&sim);

        for (offset, width) in [(63, 2), (0, 65), (64, 1), (50, 16)] {
            assert!(matches!(
                gpio.set_multiple(offset, width, 1),
                Err(Error::OutOfRange { .. })
            ));
            assert!(matches!(
                gpio.get_multiple(offset, width),
                Err(Error::OutOfRange { .. })
            ));
        }
        assert!(sim.ops().is_empty());
    }

    #[test]
    fn set_line_drives_one_offset() {
        let sim = SimLines::new();
        let gpio = Gpio::new(&sim);

        gpio.set_line(13, 1).unwrap();
        assert_eq!(sim.level(13), 1);
        assert_eq!(sim.level(12), 0);
        gpio.set_line(13, 0).unwrap();
        assert_eq!(sim.level(13), 0);
    }
}
