//! Sensor driver seam and a minimal BMM050 register core.
//!
//! [`SensorDriver`] is what the binding in [`device`](crate::device) drives: it
//! receives the capability interface by reference on every call instead of
//! holding callback slots. [`Bmm050Core`] implements it with the register
//! sequences needed to wake the device, identify it and switch its
//! operating mode. Trim loading and data compensation are not provided.

use crate::error::{Error, Result};
use crate::interface::Bmm050Interface;
use crate::params::{FunctionalState, OperationMode, Preset};
use crate::registers::{
    Control, PowerControl, Register, EXPECTED_CHIP_ID, REG_CHIP_ID, REG_REP_XY, REG_REP_Z,
};

// Settling time after setting the power-control bit (milliseconds).
const SUSPEND_TO_SLEEP_DELAY_MS: u32 = 2;

/// Register-level sensor driver consuming a [`Bmm050Interface`].
pub trait SensorDriver<IFACE>
where
    IFACE: Bmm050Interface,
{
    /// Error type reported by the driver.
    type Error;

    /// Wakes and identifies the device using the provided interface.
    fn init(&mut self, interface: &mut IFACE) -> core::result::Result<(), Self::Error>;

    /// Moves the device into `state`.
    fn set_functional_state(
        &mut self,
        interface: &mut IFACE,
        state: FunctionalState,
    ) -> core::result::Result<(), Self::Error>;
}

/// Minimal BMM050 driver: power control, chip identification, presets and
/// operating-mode transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bmm050Core {
    preset: Preset,
    chip_id: Option<u8>,
}

impl Bmm050Core {
    /// Creates a core that programs `preset` during [`SensorDriver::init`].
    pub const fn new(preset: Preset) -> Self {
        Self {
            preset,
            chip_id: None,
        }
    }

    /// Chip identifier read during the last init, if any.
    pub fn chip_id(&self) -> Option<u8> {
        self.chip_id
    }

    /// Preset applied during init.
    pub fn preset(&self) -> Preset {
        self.preset
    }

    /// Programs data rate and repetition registers for `preset`.
    pub fn apply_preset<IFACE>(
        &mut self,
        interface: &mut IFACE,
        preset: Preset,
    ) -> Result<(), IFACE::Error>
    where
        IFACE: Bmm050Interface,
    {
        Self::update_control(interface, |control| {
            control.set_data_rate(preset.data_rate())
        })?;
        interface.write_register(REG_REP_XY, preset.rep_xy())?;
        interface.write_register(REG_REP_Z, preset.rep_z())?;
        self.preset = preset;
        Ok(())
    }

    /// Reads the current power-control state.
    pub fn is_powered<IFACE>(interface: &mut IFACE) -> Result<bool, IFACE::Error>
    where
        IFACE: Bmm050Interface,
    {
        let power = PowerControl::from(interface.read_register(PowerControl::ADDRESS)?);
        Ok(power.power_control())
    }

    fn set_power_control<IFACE>(interface: &mut IFACE, on: bool) -> Result<(), IFACE::Error>
    where
        IFACE: Bmm050Interface,
    {
        let current = interface.read_register(PowerControl::ADDRESS)?;
        let updated = u8::from(PowerControl::from(current).with_power_control(on));
        interface.write_register(PowerControl::ADDRESS, updated)?;
        Ok(())
    }

    fn power_up<IFACE>(interface: &mut IFACE) -> Result<(), IFACE::Error>
    where
        IFACE: Bmm050Interface,
    {
        if !Self::is_powered(interface)? {
            Self::set_power_control(interface, true)?;
            interface.delay_ms(SUSPEND_TO_SLEEP_DELAY_MS);
        }
        Ok(())
    }

    fn update_control<IFACE, F>(interface: &mut IFACE, mutate: F) -> Result<(), IFACE::Error>
    where
        IFACE: Bmm050Interface,
        F: FnOnce(&mut Control),
    {
        let current = interface.read_register(Control::ADDRESS)?;
        let mut control = Control::from(current);
        mutate(&mut control);

        let updated = u8::from(control);
        if updated != current {
            interface.write_register(Control::ADDRESS, updated)?;
        }
        Ok(())
    }
}

impl Default for Bmm050Core {
    fn default() -> Self {
        Self::new(Preset::Regular)
    }
}

impl<IFACE> SensorDriver<IFACE> for Bmm050Core
where
    IFACE: Bmm050Interface,
{
    type Error = Error<IFACE::Error>;

    fn init(&mut self, interface: &mut IFACE) -> Result<(), IFACE::Error> {
        Self::set_power_control(interface, true)?;
        interface.delay_ms(SUSPEND_TO_SLEEP_DELAY_MS);

        let chip_id = interface.read_register(REG_CHIP_ID)?;
        self.chip_id = Some(chip_id);
        if chip_id != EXPECTED_CHIP_ID {
            warn!("bmm050: unexpected chip id {=u8:#x}", chip_id);
            return Err(Error::ChipIdMismatch(chip_id));
        }

        self.apply_preset(interface, self.preset)
    }

    fn set_functional_state(
        &mut self,
        interface: &mut IFACE,
        state: FunctionalState,
    ) -> Result<(), IFACE::Error> {
        let opmode = match state {
            FunctionalState::Suspend => return Self::set_power_control(interface, false),
            FunctionalState::Normal => OperationMode::Normal,
            FunctionalState::Forced => OperationMode::Forced,
            FunctionalState::Sleep => OperationMode::Sleep,
        };

        Self::power_up(interface)?;
        Self::update_control(interface, |control| control.set_opmode(opmode))
    }
}
