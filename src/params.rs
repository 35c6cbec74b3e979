//! Strongly typed parameter enumerations for the BMM050 binding.
//!
//! These enums map directly to datasheet field encodings and are used across
//! [`Config`](crate::config::Config) and the sensor driver. Prefer these types
//! over raw integers to keep register values valid and explicit.
//!
//! # Examples
//!
//! ```rust
//! use bmm050::params::{DataRate, FunctionalState, Preset};
//!
//! let preset = Preset::Regular;
//! assert_eq!(preset.data_rate(), DataRate::Hz10);
//! let _ = FunctionalState::Normal;
//! ```

use modular_bitfield::prelude::Specifier;

/// Operation mode field of the `CONTROL` register (bits 2:1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 2]
pub enum OperationMode {
    /// Continuous sampling at the selected data rate.
    Normal = 0b00,
    /// Single measurement, then back to sleep.
    Forced = 0b01,
    /// Reserved encoding.
    Reserved = 0b10,
    /// Registers accessible, no measurements.
    Sleep = 0b11,
}

/// Output data rate field of the `CONTROL` register (bits 5:3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 3]
pub enum DataRate {
    /// 10 Hz (power-on default).
    Hz10 = 0b000,
    /// 2 Hz.
    Hz2 = 0b001,
    /// 6 Hz.
    Hz6 = 0b010,
    /// 8 Hz.
    Hz8 = 0b011,
    /// 15 Hz.
    Hz15 = 0b100,
    /// 20 Hz.
    Hz20 = 0b101,
    /// 25 Hz.
    Hz25 = 0b110,
    /// 30 Hz.
    Hz30 = 0b111,
}

impl DataRate {
    /// Returns the output data rate in hertz.
    pub const fn hz(self) -> u32 {
        match self {
            Self::Hz10 => 10,
            Self::Hz2 => 2,
            Self::Hz6 => 6,
            Self::Hz8 => 8,
            Self::Hz15 => 15,
            Self::Hz20 => 20,
            Self::Hz25 => 25,
            Self::Hz30 => 30,
        }
    }
}

/// Device-level state requested through the sensor driver.
///
/// Unlike [`OperationMode`], this includes suspend, which is controlled by the
/// power-control bit rather than the opmode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FunctionalState {
    /// Continuously sampling.
    Normal,
    /// One-shot measurement.
    Forced,
    /// Power-control bit cleared; only `POWER_CTL` is accessible.
    Suspend,
    /// Powered, idle.
    Sleep,
}

/// Vendor repetition presets trading noise against current consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Preset {
    /// 3 XY / 3 Z repetitions at 10 Hz.
    LowPower,
    /// 9 XY / 15 Z repetitions at 10 Hz.
    Regular,
    /// 15 XY / 27 Z repetitions at 10 Hz.
    Enhanced,
    /// 47 XY / 83 Z repetitions at 20 Hz.
    HighAccuracy,
}

impl Preset {
    /// Output data rate programmed for this preset.
    pub const fn data_rate(self) -> DataRate {
        match self {
            Self::HighAccuracy => DataRate::Hz20,
            _ => DataRate::Hz10,
        }
    }

    /// Raw `REP_XY` register value; the device performs `1 + 2 * value` repetitions.
    pub const fn rep_xy(self) -> u8 {
        match self {
            Self::LowPower => 0x01,
            Self::Regular => 0x04,
            Self::Enhanced => 0x07,
            Self::HighAccuracy => 0x17,
        }
    }

    /// Raw `REP_Z` register value; the device performs `1 + value` repetitions.
    pub const fn rep_z(self) -> u8 {
        match self {
            Self::LowPower => 0x02,
            Self::Regular => 0x0E,
            Self::Enhanced => 0x1A,
            Self::HighAccuracy => 0x52,
        }
    }
}
