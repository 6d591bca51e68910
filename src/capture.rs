// ad9250-daq/src/capture.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! The host-side capture area and its persistence.
//!
//! One flat byte area receives one block per refill, block-major, in
//! exactly the interleaved layout the hardware buffer delivered. The saved
//! file is that area verbatim: no header, no metadata, int16 little-endian
//! samples.

use std::{
    fs::File,
    io::Write,
    path::Path,
};

use log::warn;

use crate::errors::{Error, Result};

/// Default output file name.
pub const DFLT_OUTPUT: &str = "intData.bin";

// --------------------------------------------------------------------------

/// A flat, block-major capture area.
///
/// Sized up front as `blocks * block_bytes` and zero-filled, so a short
/// block leaves a zeroed tail rather than stale data.
#[derive(Debug)]
pub struct CaptureArea {
    data: Vec<u8>,
    block_bytes: usize,
}

impl CaptureArea {
    /// Allocates an area for `blocks` blocks of `block_bytes` bytes each.
    pub fn new(blocks: usize, block_bytes: usize) -> Self {
        Self {
            data: vec![0; blocks * block_bytes],
            block_bytes,
        }
    }

    /// Bytes of one block.
    pub fn block_bytes(&self) -> usize {
        self.block_bytes
    }

    /// Number of block slots.
    pub fn blocks(&self) -> usize {
        if self.block_bytes == 0 {
            0
        }
        else {
            self.data.len() / self.block_bytes
        }
    }

    /// Total size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the area holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The assembled area.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copies `src` into block slot `index`, at offset `index * block_bytes`.
    ///
    /// Copies at most one block; a shorter `src` leaves the remainder of
    /// the slot zeroed. Returns the number of bytes copied.
    pub fn copy_block(&mut self, index: usize, src: &[u8]) -> usize {
        assert!(index < self.blocks(), "block index {} out of range", index);
        let n = src.len().min(self.block_bytes);
        let at = index * self.block_bytes;
        self.data[at..at + n].copy_from_slice(&src[..n]);
        n
    }

    /// Writes the whole area to `path`, truncating any existing file.
    ///
    /// The written byte count is verified; a short write is an error, not
    /// a silently truncated capture.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        let wrote = file.write(&self.data)?;
        if wrote != self.data.len() {
            warn!(
                "short write on {}: {} of {} bytes",
                path.as_ref().display(),
                wrote,
                self.data.len()
            );
            return Err(Error::ShortWrite { expected: self.data.len(), wrote });
        }
        Ok(())
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn blocks_land_at_their_offsets() {
        let mut area = CaptureArea::new(2, 8);
        assert_eq!(area.len(), 16);
        assert_eq!(area.blocks(), 2);

        assert_eq!(area.copy_block(0, &[1, 2, 3, 4, 5, 6, 7, 8]), 8);
        assert_eq!(area.copy_block(1, &[9, 9, 9, 9, 9, 9, 9, 9]), 8);
        assert_eq!(area.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 9, 9, 9, 9, 9, 9, 9]);
    }

    #[test]
    fn short_block_keeps_zero_tail() {
        let mut area = CaptureArea::new(2, 4);
        assert_eq!(area.copy_block(1, &[7, 7]), 2);
        assert_eq!(area.as_bytes(), &[0, 0, 0, 0, 7, 7, 0, 0]);
    }

    #[test]
    fn oversized_source_is_clipped() {
        let mut area = CaptureArea::new(1, 2);
        assert_eq!(area.copy_block(0, &[1, 2, 3, 4]), 2);
        assert_eq!(area.as_bytes(), &[1, 2]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn block_index_past_the_end_panics() {
        let mut area = CaptureArea::new(2, 4);
        area.copy_block(2, &[0; 4]);
    }

    #[test]
    fn save_writes_the_area_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DFLT_OUTPUT);

        let mut area = CaptureArea::new(2, 4);
        area.copy_block(0, &[1, 2, 3, 4]);
        area.copy_block(1, &[5, 6, 7, 8]);
        area.save(&path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), area.as_bytes());
    }

    #[test]
    fn save_truncates_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DFLT_OUTPUT);
        fs::write(&path, vec![0xFFu8; 64]).unwrap();

        let area = CaptureArea::new(1, 4);
        area.save(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), 4);
    }
}
