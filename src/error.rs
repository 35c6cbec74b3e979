//! Error handling primitives for the BMM050 binding.

/// Vendor status code reported for a successful bus transaction.
pub const BMM050_SUCCESS: i8 = 0;
/// Vendor status code reported for a failed bus transaction.
pub const BMM050_ERROR: i8 = -1;

/// Crate-wide result type alias.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Outcome of a failed register transaction on the SPI transport.
///
/// Exhausting the retry budget and a hard error on the first attempt are
/// reported identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The payload phase did not complete with an OK status.
    Transfer,
    /// A write was requested on an address carrying the read direction bit.
    InvalidRegister,
}

/// Error variants produced by the sensor driver layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Any error reported by the underlying bus interface.
    Interface(E),
    /// The provided configuration parameters are invalid.
    InvalidConfig,
    /// `CHIP_ID` did not read back as the BMM050 identifier.
    ChipIdMismatch(u8),
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Interface(err)
    }
}

/// Collapses a transaction result into the vendor's integer status convention.
pub fn status_code<T, E>(result: &core::result::Result<T, E>) -> i8 {
    match result {
        Ok(_) => BMM050_SUCCESS,
        Err(_) => BMM050_ERROR,
    }
}
