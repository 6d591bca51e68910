// ad9250-daq/src/trigger.rs
//
// Copyright (c) 2025, IPFN, Instituto Superior Tecnico
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Trigger-delay register programming.
//!
//! The timing unit exposes a small set of delay registers behind a
//! bit-banged write protocol: drive the 2-bit register address, drive the
//! 16-bit value, then pulse the write strobe. The hardware latches the
//! staged address/value pair on the falling edge of the strobe.
//!
//! Registers 1 and 3 take the positive acquisition delay; register 2 takes
//! a negative compensation delay, carried as a two's-complement 16-bit
//! pattern on the value lines.

use crate::{
    errors::Result,
    gpio::{Gpio, LineAccess},
};

/// Trigger-active indicator line (output).
pub const TRIG_ACTIVE_OFFSET: u32 = 9;
/// Spare input line next to the indicator.
pub const TRIG_INPUT_OFFSET: u32 = 10;
/// First of the two register-address lines.
pub const REG_ADDR_OFFSET: u32 = 11;
/// Width of the register-address field.
pub const REG_ADDR_WIDTH: u32 = 2;
/// Armed/readiness indicator, raised after every register commit.
pub const ARMED_OFFSET: u32 = 12;
/// Write-strobe line; the register latches on its falling edge.
pub const REG_STROBE_OFFSET: u32 = 13;
/// Enable indicator line (sysref-enable).
pub const ENABLE_INDICATOR_OFFSET: u32 = 32;
/// Trigger-enable bit; dropped at the end of a run to reset the trigger
/// state machine.
pub const TRIG_ENABLE_OFFSET: u32 = 36;
/// First of the sixteen value-field lines.
pub const REG_VALUE_OFFSET: u32 = 40;
/// Width of the value field.
pub const REG_VALUE_WIDTH: u32 = 16;

/// Default acquisition delay, in delay-clock ticks.
pub const DFLT_TRIGGER_DELAY: i16 = 4000;
/// Default compensation delay for register 2, in delay-clock ticks.
pub const DFLT_COMPENSATION: i16 = -6000;

/// Delay-clock divider used when converting a raw count to time.
const DELAY_CLOCK_DIV: f64 = 5.0;
/// Microseconds per divided tick.
const DELAY_TICK_US: f64 = 8e-3;

/// Converts a raw delay-register count to microseconds.
pub fn delay_us(raw: u16) -> f64 {
    f64::from(raw) / DELAY_CLOCK_DIV * DELAY_TICK_US
}

// --------------------------------------------------------------------------

/// Sequences trigger-register writes over a [`LineAccess`] backend.
///
/// A partially written register produces physically meaningless acquisition
/// timing, so every line operation is checked and the first failure aborts
/// the whole configuration.
#[derive(Debug)]
pub struct TriggerController<L: LineAccess> {
    gpio: Gpio<L>,
}

impl<L: LineAccess> TriggerController<L> {
    /// Creates a controller over a line-access backend.
    pub fn new(lines: L) -> Self {
        Self { gpio: Gpio::new(lines) }
    }

    /// Drops the write strobe.
    ///
    /// Done once before the first register write so the first rising edge
    /// is well defined.
    pub fn clear_strobe(&self) -> Result<()> {
        self.gpio.set_line(REG_STROBE_OFFSET, 0)
    }

    /// Commits `value` into delay register `index`.
    ///
    /// Stages the address and value fields, pulses the strobe high then
    /// low, and raises the armed indicator. No read-back verification is
    /// performed here; [`read_delay`](Self::read_delay) serves for
    /// after-the-run diagnostics.
    pub fn write_register(&self, index: u8, value: i16) -> Result<()> {
        self.gpio
            .set_multiple(REG_ADDR_OFFSET, REG_ADDR_WIDTH, u32::from(index & 0x3))?;
        self.gpio
            .set_multiple(REG_VALUE_OFFSET, REG_VALUE_WIDTH, u32::from(value as u16))?;
        self.gpio.set_line(REG_STROBE_OFFSET, 1)?;
        self.gpio.set_line(REG_STROBE_OFFSET, 0)?;
        self.gpio.set_line(ARMED_OFFSET, 1)?;
        Ok(())
    }

    /// Programs the full delay-register set for one run: registers 1 and 3
    /// with the acquisition delay, register 2 with the compensation delay.
    pub fn program_delays(&self, delay: i16, compensation: i16) -> Result<()> {
        self.clear_strobe()?;
        self.write_register(1, delay)?;
        self.write_register(3, delay)?;
        self.write_register(2, compensation)?;
        Ok(())
    }

    /// Reads the raw count currently on the value-field lines.
    pub fn read_delay(&self) -> Result<u16> {
        let raw = self.gpio.get_multiple(REG_VALUE_OFFSET, REG_VALUE_WIDTH)?;
        Ok(raw as u16)
    }

    /// Drops the trigger-enable bit, resetting the trigger state machine.
    pub fn disarm(&self) -> Result<()> {
        self.gpio.set_line(TRIG_ENABLE_OFFSET, 0)
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{LineOp, SimLines};

    fn offsets(from: u32, width: u32) -> Vec<u32> {
        (from..from + width).collect()
    }

    #[test]
    fn write_protocol_ordering() {
        let sim = SimLines::new();
        let trig = TriggerController::new(&sim);

        trig.write_register(1, 4000).unwrap();

        let ops = sim.ops();
        assert_eq!(ops.len(), 5);
        // Address field, value field, strobe up, strobe down, armed flag.
        assert_eq!(
            ops[0],
            LineOp::Set { offsets: offsets(REG_ADDR_OFFSET, 2), values: vec![1, 0] }
        );
        let value_bits = (0..16).map(|i| ((4000u16 >> i) & 1) as u8).collect::<Vec<_>>();
        assert_eq!(
            ops[1],
            LineOp::Set { offsets: offsets(REG_VALUE_OFFSET, 16), values: value_bits }
        );
        assert_eq!(ops[2], LineOp::Set { offsets: vec![REG_STROBE_OFFSET], values: vec![1] });
        assert_eq!(ops[3], LineOp::Set { offsets: vec![REG_STROBE_OFFSET], values: vec![0] });
        assert_eq!(ops[4], LineOp::Set { offsets: vec![ARMED_OFFSET], values: vec![1] });
    }

    #[test]
    fn negative_delay_two_complement() {
        let sim = SimLines::new();
        let trig = TriggerController::new(&sim);

        trig.write_register(2, -6000).unwrap();
        assert_eq!(trig.read_delay().unwrap(), 59536);

        // Same field pattern as writing the unsigned equivalent.
        trig.write_register(2, 59536u16 as i16).unwrap();
        assert_eq!(trig.read_delay().unwrap(), 59536);
    }

    #[test]
    fn program_delays_writes_three_registers() {
        let sim = SimLines::new();
        let trig = TriggerController::new(&sim);

        trig.program_delays(DFLT_TRIGGER_DELAY, DFLT_COMPENSATION).unwrap();

        let ops = sim.ops();
        // Clear strobe first, then three 5-op register writes.
        assert_eq!(ops.len(), 1 + 3 * 5);
        assert_eq!(ops[0], LineOp::Set { offsets: vec![REG_STROBE_OFFSET], values: vec![0] });

        let strobe_ups = ops
            .iter()
            .filter(|op| {
                matches!(op, LineOp::Set { offsets, values }
                    if offsets == &[REG_STROBE_OFFSET] && values == &[1])
            })
            .count();
        assert_eq!(strobe_ups, 3);

        // Last committed value is the compensation pattern.
        assert_eq!(trig.read_delay().unwrap(), 59536);
        // Address lines hold register 2, with the armed flag overriding
        // the upper address line afterwards.
        assert_eq!(sim.level(REG_ADDR_OFFSET), 0);
        assert_eq!(sim.level(ARMED_OFFSET), 1);
    }

    #[test]
    fn disarm_drops_trigger_enable() {
        let sim = SimLines::new();
        sim.set_lines(&[TRIG_ENABLE_OFFSET], &[1]).unwrap();

        let trig = TriggerController::new(&sim);
        trig.disarm().unwrap();
        assert_eq!(sim.level(TRIG_ENABLE_OFFSET), 0);
    }

    #[test]
    fn tick_conversion() {
        assert!((delay_us(5000) - 8.0).abs() < 1e-9);
        assert!((delay_us(0)).abs() < f64::EPSILON);
    }
}
