// ad9250-daq/src/stop.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Graceful-stop request flag.
//!
//! The interrupt handler sets the flag; the acquisition loop polls it
//! between refills. A refill already in flight still blocks until the
//! hardware completes it.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A process-wide stop request, set from the signal path and read-only
/// everywhere else.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    flag: Arc<AtomicBool>,
}

impl StopFlag {
    /// A fresh, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Safe to call from a signal handler thread.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_visible_through_clones() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(!other.is_set());

        flag.request();
        assert!(other.is_set());
    }
}
