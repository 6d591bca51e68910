// ad9250-daq/tests/sim_capture.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
// End-to-end run of the acquisition sequence against the simulated
// backends: trigger programming, session lifecycle, capture assembly, and
// the saved file's exact layout.

use std::fs;

use ad9250_daq::{
    regmap::{RegisterWindow, GPIO1_DATA_OFFSET},
    session::{Config, Policy, Session, PRIMARY_DEVICE, SECONDARY_DEVICE},
    sim::{SimAdc, SimLines},
    stop::StopFlag,
    trigger::TriggerController,
};

const BLOCKS: usize = 2;
const SAMPLES: usize = 1024;
const CHANNELS: usize = 2;
const SAMPLE_BYTES: usize = 2;

#[test]
fn full_simulated_acquisition() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intData.bin");

    // Trigger programming, as the tool does it before streaming.
    let lines = SimLines::new();
    let trigger = TriggerController::new(&lines);
    trigger.program_delays(4000, -6000).unwrap();

    let mut window = RegisterWindow::anon().unwrap();

    let adc = SimAdc::new(&[PRIMARY_DEVICE, SECONDARY_DEVICE]);
    let stats = adc.stats();
    let cfg = Config {
        blocks: BLOCKS,
        samples_per_block: SAMPLES,
        policy: Policy::Strict,
        ..Config::default()
    };

    let mut session = Session::open(adc, cfg).unwrap();
    session.enable_channels().unwrap();
    window.write32(GPIO1_DATA_OFFSET, 0x11);
    session.arm().unwrap();

    let run = session.run(&StopFlag::new()).unwrap();
    session.close();

    assert_eq!(run.step, CHANNELS * SAMPLE_BYTES);
    assert_eq!(run.samples, SAMPLES);

    // The delay registers were committed; the value lines still carry the
    // last written (compensation) pattern.
    assert_eq!(trigger.read_delay().unwrap(), 59536);
    trigger.disarm().unwrap();
    assert_eq!(window.read32(GPIO1_DATA_OFFSET), 0x11);

    session.capture().unwrap().save(&path).unwrap();

    // Block-major file: 2 blocks x 2 channels x 1024 samples x 2 bytes,
    // first block all zeros, second block all ones.
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), BLOCKS * CHANNELS * SAMPLES * SAMPLE_BYTES);

    let block_bytes = CHANNELS * SAMPLES * SAMPLE_BYTES;
    assert!(bytes[..block_bytes].iter().all(|&b| b == 0));
    for sample in bytes[block_bytes..].chunks_exact(SAMPLE_BYTES) {
        assert_eq!(i16::from_le_bytes([sample[0], sample[1]]), 1);
    }

    // Teardown left nothing behind: one buffer created and destroyed, both
    // primary channels disabled.
    let s = stats.get();
    assert_eq!(s.buffers_created, 1);
    assert_eq!(s.buffers_destroyed, 1);
    assert_eq!(s.enables, 2);
    assert_eq!(s.disables, 2);
    assert_eq!(s.refills, BLOCKS);
}

#[test]
fn interrupted_run_still_tears_down() {
    let adc = SimAdc::new(&[PRIMARY_DEVICE, SECONDARY_DEVICE]);
    let stats = adc.stats();

    let cfg = Config {
        blocks: BLOCKS,
        samples_per_block: SAMPLES,
        ..Config::default()
    };
    let mut session = Session::open(adc, cfg).unwrap();
    session.enable_channels().unwrap();
    session.arm().unwrap();

    let stop = StopFlag::new();
    stop.request();
    assert!(session.run(&stop).is_err());
    drop(session);

    let s = stats.get();
    assert_eq!(s.refills, 0);
    assert_eq!(s.buffers_destroyed, 1);
    assert_eq!(s.disables, 2);
}
