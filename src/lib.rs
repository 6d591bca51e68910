// ad9250-daq/src/lib.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//!
//! Single-shot streaming acquisition for the AD9250 FMC ADC board.
//!
//! The board delivers two 14-bit channels per device over Linux Industrial
//! I/O (IIO); acquisition timing is controlled by an external trigger unit
//! whose delay registers are programmed through bit-banged GPIO lines, with
//! a memory-mapped AXI GPIO block providing the run-enable word.
//!
//! The crate is built around one [`Session`] per run, a
//! [`TriggerController`] for the delay registers, and a flat
//! [`CaptureArea`] persisted as raw little-endian int16 samples. The
//! hardware seams ([`Adc`], [`LineAccess`](gpio::LineAccess)) have a
//! deterministic in-memory implementation in [`sim`], used by the test
//! suite and by `--sim` dry runs; the IIO-backed implementation lives in
//! [`iio`] behind the `iio` feature.

// Lints
#![deny(
    missing_docs,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

pub use crate::adc::*;
pub use crate::capture::*;
pub use crate::errors::*;
pub use crate::session::*;
pub use crate::stop::*;
pub use crate::trigger::*;

pub mod adc;
pub mod capture;
pub mod errors;
pub mod gpio;
#[cfg(feature = "iio")]
pub mod iio;
pub mod regmap;
pub mod session;
pub mod sim;
pub mod stop;
pub mod trigger;
