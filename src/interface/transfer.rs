//! Blocking SPI transfer primitive with a tri-state status.

use embedded_hal::spi::SpiBus;

/// Outcome of a single low-level transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferStatus {
    /// The transfer completed.
    Ok,
    /// Nothing has been attempted yet.
    NoChange,
    /// The peripheral reported an error or was busy.
    Error,
}

impl TransferStatus {
    /// Returns `true` for [`TransferStatus::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Blocking transfer primitive consumed by the retrying transport.
pub trait SpiTransfer {
    /// Clocks `data` out on the bus.
    fn transfer_write(&mut self, data: &[u8]) -> TransferStatus;

    /// Clocks `buf.len()` bytes in while sending `dummy` for each of them.
    fn transfer_read(&mut self, buf: &mut [u8], dummy: u8) -> TransferStatus;
}

/// Adapts an `embedded-hal` [`SpiBus`] to [`SpiTransfer`].
///
/// Every call flushes the bus before returning so the transfer is complete
/// when the chip-select line is released.
pub struct BlockingSpi<SPI> {
    spi: SPI,
}

impl<SPI> BlockingSpi<SPI> {
    /// Wraps the provided bus.
    pub const fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Provides mutable access to the wrapped bus.
    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Consumes the adapter and returns the owned bus.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> SpiTransfer for BlockingSpi<SPI>
where
    SPI: SpiBus<u8>,
{
    fn transfer_write(&mut self, data: &[u8]) -> TransferStatus {
        match self.spi.write(data).and_then(|()| self.spi.flush()) {
            Ok(()) => TransferStatus::Ok,
            Err(_) => TransferStatus::Error,
        }
    }

    fn transfer_read(&mut self, buf: &mut [u8], dummy: u8) -> TransferStatus {
        buf.fill(dummy);
        match self.spi.transfer_in_place(buf).and_then(|()| self.spi.flush()) {
            Ok(()) => TransferStatus::Ok,
            Err(_) => TransferStatus::Error,
        }
    }
}
