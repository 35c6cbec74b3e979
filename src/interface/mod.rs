//! Bus interface abstraction for the BMM050 binding.

pub mod spi;
pub mod transfer;

/// Capability interface the sensor driver calls back into: register write,
/// register read and a millisecond delay.
pub trait Bmm050Interface {
    /// Error type produced by the concrete bus implementation.
    type Error;

    /// Writes `data` starting at `register`.
    fn write_many(&mut self, register: u8, data: &[u8]) -> core::result::Result<(), Self::Error>;

    /// Reads `buf.len()` bytes starting at `register`.
    fn read_many(&mut self, register: u8, buf: &mut [u8]) -> core::result::Result<(), Self::Error>;

    /// Blocks for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Writes a single register.
    fn write_register(&mut self, register: u8, value: u8) -> core::result::Result<(), Self::Error> {
        self.write_many(register, core::slice::from_ref(&value))
    }

    /// Reads a single register.
    fn read_register(&mut self, register: u8) -> core::result::Result<u8, Self::Error> {
        let mut value = [0u8; 1];
        self.read_many(register, &mut value)?;
        Ok(value[0])
    }
}
