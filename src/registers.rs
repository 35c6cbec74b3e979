//! Register map definitions for the BMM050 geomagnetic sensor.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

use crate::params::{DataRate, OperationMode};

/// Register address of `CHIP_ID`.
pub const REG_CHIP_ID: u8 = 0x40;
/// Register address of `POWER_CTL`.
pub const REG_POWER_CTL: u8 = 0x4B;
/// Register address of `CONTROL` (opmode, data rate, self-test).
pub const REG_CONTROL: u8 = 0x4C;
/// Register address of `REP_XY`.
pub const REG_REP_XY: u8 = 0x51;
/// Register address of `REP_Z`.
pub const REG_REP_Z: u8 = 0x52;

/// Value read back from `CHIP_ID` on a BMM050.
pub const EXPECTED_CHIP_ID: u8 = 0x32;

/// Direction tag OR-ed into the address byte of SPI read transactions.
pub const SPI_READ_FLAG: u8 = 0x80;

/// Minimal metadata exposed by every register value type.
pub trait Register {
    /// Raw storage backing the register payload.
    type Raw: Copy;
    /// Register address as documented in the datasheet.
    const ADDRESS: u8;
    /// Optional reset/default value defined by the datasheet.
    const RESET_VALUE: Option<Self::Raw>;
}

/// Bitfield representation of the `POWER_CTL` register (address `0x4B`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerControl {
    // Power control bit; cleared means suspend (bit 0).
    pub power_control: bool,
    // Soft reset, must be written together with bit 7 (bit 1).
    pub soft_reset_lsb: bool,
    // Three-wire SPI enable (bit 2).
    pub spi3_enable: bool,
    #[skip]
    __: B4,
    // Soft reset, must be written together with bit 1 (bit 7).
    pub soft_reset_msb: bool,
}

impl From<u8> for PowerControl {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<PowerControl> for u8 {
    fn from(value: PowerControl) -> Self {
        value.into_bytes()[0]
    }
}

/// Bitfield representation of the `CONTROL` register (address `0x4C`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    // Normal self-test trigger (bit 0).
    pub self_test: bool,
    // Operation mode (bits 2:1).
    pub opmode: OperationMode,
    // Output data rate (bits 5:3).
    pub data_rate: DataRate,
    // Advanced self-test control (bits 7:6).
    pub adv_self_test: B2,
}

impl From<u8> for Control {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<Control> for u8 {
    fn from(value: Control) -> Self {
        value.into_bytes()[0]
    }
}

impl Register for PowerControl {
    type Raw = u8;
    const ADDRESS: u8 = REG_POWER_CTL;
    const RESET_VALUE: Option<Self::Raw> = Some(0x00);
}

impl Register for Control {
    type Raw = u8;
    const ADDRESS: u8 = REG_CONTROL;
    const RESET_VALUE: Option<Self::Raw> = Some(0x06);
}
