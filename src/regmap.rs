// ad9250-daq/src/regmap.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Direct access to the AXI GPIO register block.
//!
//! The block sits at a fixed physical address and is reached by mapping the
//! page that contains it out of `/dev/mem`. Accesses are raw 32-bit volatile
//! reads and writes; there is exactly one thread of control, so no locking
//! is taken.

use std::{fs::OpenOptions, os::unix::fs::OpenOptionsExt, ptr};

use memmap2::{MmapMut, MmapOptions};
use nix::fcntl::OFlag;

use crate::errors::Result;

/// Physical base address of the AXI GPIO block.
pub const GPIO_BASE_ADDRESS: u64 = 0x4000_0000;

/// Size of the mapped window, one page.
pub const MAP_SIZE: usize = 4096;

/// GPIO bank 0 data register.
pub const GPIO0_DATA_OFFSET: usize = 0;
/// Direction/enable register.
pub const GPIO_DIRECTION_OFFSET: usize = 4;
/// GPIO bank 1 data register.
pub const GPIO1_DATA_OFFSET: usize = 8;

// --------------------------------------------------------------------------

/// A page-aligned mapping of the register block.
///
/// The mapping and the `/dev/mem` descriptor are released when the window
/// is dropped.
#[derive(Debug)]
pub struct RegisterWindow {
    map: MmapMut,
    /// Offset of the device base inside the mapped page; the physical base
    /// need not be page-aligned.
    base: usize,
}

impl RegisterWindow {
    /// Maps the page containing `phys_base` out of `/dev/mem`.
    pub fn open(phys_base: u64) -> Result<Self> {
        let page_mask = (MAP_SIZE - 1) as u64;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_SYNC.bits())
            .open("/dev/mem")?;
        let map = unsafe {
            MmapOptions::new()
                .offset(phys_base & !page_mask)
                .len(MAP_SIZE)
                .map_mut(&file)?
        };
        Ok(Self {
            map,
            base: (phys_base & page_mask) as usize,
        })
    }

    /// An anonymous window of the same size, for tests and simulated runs.
    pub fn anon() -> Result<Self> {
        let map = MmapOptions::new().len(MAP_SIZE).map_anon()?;
        Ok(Self { map, base: 0 })
    }

    /// Reads a 32-bit register at `offset` from the device base.
    pub fn read32(&self, offset: usize) -> u32 {
        let off = self.reg_offset(offset);
        unsafe { ptr::read_volatile(self.map.as_ptr().add(off) as *const u32) }
    }

    /// Writes a 32-bit register at `offset` from the device base.
    pub fn write32(&mut self, offset: usize, value: u32) {
        let off = self.reg_offset(offset);
        unsafe { ptr::write_volatile(self.map.as_mut_ptr().add(off) as *mut u32, value) }
    }

    fn reg_offset(&self, offset: usize) -> usize {
        let off = self.base + offset;
        assert!(off + 4 <= MAP_SIZE, "register offset {} outside the window", offset);
        off
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_are_independent() {
        let mut win = RegisterWindow::anon().unwrap();

        win.write32(GPIO0_DATA_OFFSET, 0xDEAD_BEEF);
        win.write32(GPIO_DIRECTION_OFFSET, 0x0000_0011);
        win.write32(GPIO1_DATA_OFFSET, 0x11);

        assert_eq!(win.read32(GPIO0_DATA_OFFSET), 0xDEAD_BEEF);
        assert_eq!(win.read32(GPIO_DIRECTION_OFFSET), 0x11);
        assert_eq!(win.read32(GPIO1_DATA_OFFSET), 0x11);
    }

    #[test]
    fn fresh_window_reads_zero() {
        let win = RegisterWindow::anon().unwrap();
        assert_eq!(win.read32(GPIO0_DATA_OFFSET), 0);
        assert_eq!(win.read32(GPIO1_DATA_OFFSET), 0);
    }

    #[test]
    #[should_panic(expected = "outside the window")]
    fn offset_past_the_page_panics() {
        let win = RegisterWindow::anon().unwrap();
        let _ = win.read32(MAP_SIZE);
    }
}
