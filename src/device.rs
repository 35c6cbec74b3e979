//! Binding of the sensor driver to the retrying SPI transport.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::config::Config;
use crate::error::{BusError, Error};
use crate::interface::spi::SpiInterface;
use crate::interface::transfer::{BlockingSpi, SpiTransfer};
use crate::params::FunctionalState;
use crate::sensor::{Bmm050Core, SensorDriver};

/// Context object owning the sensor driver and the SPI transport it talks through.
///
/// There is one instance per physical sensor, created at startup and passed
/// by reference to whatever needs bus access.
pub struct Bmm050<DRV, XFER, CS, D> {
    driver: DRV,
    interface: SpiInterface<XFER, CS, D>,
}

impl<DRV, XFER, CS, D> Bmm050<DRV, XFER, CS, D>
where
    XFER: SpiTransfer,
    CS: OutputPin,
    D: DelayNs,
    DRV: SensorDriver<SpiInterface<XFER, CS, D>>,
{
    // ==================================================================
    // == Driver Construction & Ownership ===============================
    // ==================================================================
    /// Creates a new binding from a driver and a prepared transport.
    pub fn new(driver: DRV, interface: SpiInterface<XFER, CS, D>) -> Self {
        Self { driver, interface }
    }

    /// Consumes the binding and returns the driver and transport.
    pub fn release(self) -> (DRV, SpiInterface<XFER, CS, D>) {
        (self.driver, self.interface)
    }

    /// Shared access to the bound driver.
    pub fn driver(&self) -> &DRV {
        &self.driver
    }

    /// Mutable access to the bound driver.
    pub fn driver_mut(&mut self) -> &mut DRV {
        &mut self.driver
    }

    /// Mutable access to the transport.
    pub fn interface_mut(&mut self) -> &mut SpiInterface<XFER, CS, D> {
        &mut self.interface
    }

    // ==================================================================
    // == Initialization ================================================
    // ==================================================================
    /// Configures the chip-select line, initializes the driver and puts the
    /// sensor into normal mode.
    ///
    /// Failures of either driver step are logged and otherwise ignored; use
    /// [`try_initialize`](Self::try_initialize) to observe them. Every call
    /// repeats the whole sequence.
    pub fn initialize(&mut self) {
        let (init, mode) = self.run_init_sequence();
        if init.is_err() {
            warn!("bmm050: driver init failed");
        }
        if mode.is_err() {
            warn!("bmm050: switching to normal mode failed");
        }
    }

    /// Same sequence as [`initialize`](Self::initialize), returning the first
    /// driver error. Normal mode is requested even when init failed.
    pub fn try_initialize(&mut self) -> core::result::Result<(), DRV::Error> {
        let (init, mode) = self.run_init_sequence();
        init.and(mode)
    }

    fn run_init_sequence(
        &mut self,
    ) -> (
        core::result::Result<(), DRV::Error>,
        core::result::Result<(), DRV::Error>,
    ) {
        self.interface.configure_slave();

        debug!("bmm050: running driver init");
        let init = self.driver.init(&mut self.interface);

        // Device comes out of power-on in suspend; normal mode is forced every time.
        let mode = self
            .driver
            .set_functional_state(&mut self.interface, FunctionalState::Normal);

        (init, mode)
    }

    // ==================================================================
    // == Bus Operations ================================================
    // ==================================================================
    /// Writes `data` to consecutive registers starting at `register` (`0..=127`).
    pub fn write(&mut self, register: u8, data: &[u8]) -> core::result::Result<(), BusError> {
        self.interface.write(register, data)
    }

    /// Reads `buf.len()` consecutive registers starting at `register`.
    ///
    /// `buf` holds meaningful data only when `Ok` is returned.
    pub fn read(&mut self, register: u8, buf: &mut [u8]) -> core::result::Result<(), BusError> {
        self.interface.read(register, buf)
    }

    /// Blocks for `ms` milliseconds. Zero returns immediately.
    pub fn delay(&mut self, ms: u32) {
        self.interface.delay(ms);
    }
}

impl<SPI, CS, D> Bmm050<Bmm050Core, BlockingSpi<SPI>, CS, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    // ==================================================================
    // == SPI Convenience Constructors ==================================
    // ==================================================================
    /// Convenience constructor wiring an `embedded-hal` SPI bus, chip-select
    /// pin and delay source to the built-in [`Bmm050Core`].
    pub fn new_spi(spi: SPI, cs: CS, delay: D, config: Config) -> crate::Result<Self, BusError> {
        config.validate().map_err(|_| Error::InvalidConfig)?;

        let interface = SpiInterface::new(BlockingSpi::new(spi), cs, delay, config.retry_policy());
        Ok(Self::new(Bmm050Core::new(config.preset), interface))
    }

    /// Releases the binding, returning the SPI bus, chip-select pin and delay.
    pub fn release_spi(self) -> (SPI, CS, D) {
        let (_, interface) = self.release();
        let (transfer, cs, delay) = interface.release();
        (transfer.release(), cs, delay)
    }
}
