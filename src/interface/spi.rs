//! Retrying SPI register transport with slave-select framing.
//!
//! Each transaction asserts the chip-select line, sends the address byte,
//! transfers the payload and releases the line again. Both phases are retried
//! up to [`RetryPolicy::max_attempts`] times with no backoff. Only the status of
//! the payload phase decides the outcome of the call.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::transfer::{SpiTransfer, TransferStatus};
use super::Bmm050Interface;
use crate::config::RetryPolicy;
use crate::error::BusError;
use crate::registers::SPI_READ_FLAG;

/// One active-low chip-select line bound to the sensor.
pub struct SlaveHandle<CS> {
    cs: CS,
}

impl<CS> SlaveHandle<CS>
where
    CS: OutputPin,
{
    /// Wraps the chip-select pin. The pin is not driven until [`configure`](Self::configure).
    pub const fn new(cs: CS) -> Self {
        Self { cs }
    }

    /// Drives the line to its idle (deselected) level. Pin errors are ignored.
    pub fn configure(&mut self) {
        self.cs.set_high().ok();
    }

    /// Asserts or releases the line. Pin errors are ignored.
    pub fn set_selected(&mut self, asserted: bool) {
        if asserted {
            self.cs.set_low().ok();
        } else {
            self.cs.set_high().ok();
        }
    }

    /// Asserts the line until the returned guard is dropped.
    pub fn select(&mut self) -> Selected<'_, CS> {
        self.set_selected(true);
        Selected { slave: self }
    }

    /// Consumes the handle and returns the owned pin.
    pub fn release(self) -> CS {
        self.cs
    }
}

/// Guard keeping the slave selected; releases the line when dropped.
pub struct Selected<'a, CS>
where
    CS: OutputPin,
{
    slave: &'a mut SlaveHandle<CS>,
}

impl<CS> Drop for Selected<'_, CS>
where
    CS: OutputPin,
{
    fn drop(&mut self) {
        self.slave.set_selected(false);
    }
}

/// Runs `attempt` until it reports OK or `max_attempts` attempts were made.
///
/// Always attempts at least once, so the [`TransferStatus::NoChange`] sentinel
/// is never reported for an untried phase. Returns the last status and the
/// attempt count.
fn retry<F>(max_attempts: u16, mut attempt: F) -> (TransferStatus, u16)
where
    F: FnMut() -> TransferStatus,
{
    let mut attempts: u16 = 0;
    loop {
        let status = attempt();
        attempts = attempts.saturating_add(1);
        if status.is_ok() || attempts >= max_attempts {
            return (status, attempts);
        }
    }
}

/// SPI-based register transport for the BMM050.
pub struct SpiInterface<XFER, CS, D> {
    transfer: XFER,
    slave: SlaveHandle<CS>,
    delay: D,
    policy: RetryPolicy,
}

impl<XFER, CS, D> SpiInterface<XFER, CS, D>
where
    XFER: SpiTransfer,
    CS: OutputPin,
    D: DelayNs,
{
    /// Creates a new interface from a transfer primitive, chip-select pin and delay source.
    ///
    /// `policy` is taken as given; a `max_attempts` of zero behaves like one
    /// since every phase is attempted at least once. Use
    /// [`Config::validate`](crate::config::Config::validate) to reject it up front.
    pub const fn new(transfer: XFER, cs: CS, delay: D, policy: RetryPolicy) -> Self {
        Self {
            transfer,
            slave: SlaveHandle::new(cs),
            delay,
            policy,
        }
    }

    /// Drives the chip-select line to its idle level.
    pub fn configure_slave(&mut self) {
        debug!("bmm050: configuring slave select");
        self.slave.configure();
    }

    /// Returns the active retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Provides mutable access to the wrapped transfer primitive.
    pub fn transfer_mut(&mut self) -> &mut XFER {
        &mut self.transfer
    }

    /// Consumes the interface and returns its parts.
    pub fn release(self) -> (XFER, CS, D) {
        (self.transfer, self.slave.release(), self.delay)
    }

    /// Performs one framed write transaction.
    pub fn write(&mut self, register: u8, data: &[u8]) -> Result<(), BusError> {
        if register & SPI_READ_FLAG != 0 {
            return Err(BusError::InvalidRegister);
        }

        let max_attempts = self.policy.max_attempts;
        let command = [register];
        let transfer = &mut self.transfer;
        let _selected = self.slave.select();

        let (address, attempts) = retry(max_attempts, || transfer.transfer_write(&command));
        if !address.is_ok() {
            warn!(
                "bmm050: write address {=u8:#x} not acknowledged after {=u16} attempts",
                register,
                attempts
            );
        }

        let (status, attempts) = retry(max_attempts, || transfer.transfer_write(data));
        trace!("bmm050: write {=u8:#x} finished after {=u16} attempts", register, attempts);

        Self::outcome(status)
    }

    /// Performs one framed read transaction into `buf`.
    ///
    /// The direction bit is forced on a local copy of `register`, so any
    /// address in `0..=255` is accepted.
    pub fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let max_attempts = self.policy.max_attempts;
        let dummy = self.policy.read_dummy;
        let command = [register | SPI_READ_FLAG];
        let transfer = &mut self.transfer;
        let _selected = self.slave.select();

        let (address, attempts) = retry(max_attempts, || transfer.transfer_write(&command));
        if !address.is_ok() {
            warn!(
                "bmm050: read address {=u8:#x} not acknowledged after {=u16} attempts",
                register,
                attempts
            );
        }

        let (status, attempts) =
            retry(max_attempts, || transfer.transfer_read(&mut *buf, dummy));
        trace!("bmm050: read {=u8:#x} finished after {=u16} attempts", register, attempts);

        Self::outcome(status)
    }

    /// Blocks for `ms` milliseconds.
    pub fn delay(&mut self, ms: u32) {
        if ms == 0 {
            return;
        }
        self.delay.delay_ms(ms);
    }

    fn outcome(status: TransferStatus) -> Result<(), BusError> {
        if status.is_ok() {
            Ok(())
        } else {
            Err(BusError::Transfer)
        }
    }
}

impl<XFER, CS, D> Bmm050Interface for SpiInterface<XFER, CS, D>
where
    XFER: SpiTransfer,
    CS: OutputPin,
    D: DelayNs,
{
    type Error = BusError;

    fn write_many(&mut self, register: u8, data: &[u8]) -> core::result::Result<(), Self::Error> {
        self.write(register, data)
    }

    fn read_many(&mut self, register: u8, buf: &mut [u8]) -> core::result::Result<(), Self::Error> {
        self.read(register, buf)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    /// How a phase of the scripted transfer behaves.
    #[derive(Clone, Copy)]
    enum Script {
        /// Fails the first `n` attempts, then succeeds.
        FailFirst(u16),
        /// Never succeeds.
        AlwaysFail,
    }

    impl Script {
        fn status(self, attempt: u16) -> TransferStatus {
            match self {
                Script::FailFirst(n) if attempt >= n => TransferStatus::Ok,
                _ => TransferStatus::Error,
            }
        }
    }

    /// Transfer primitive that tells the address phase apart from the payload
    /// phase by call order within a single transaction.
    struct ScriptedTransfer {
        address: Script,
        payload: Script,
        budget: u16,
        response: Vec<u8>,
        address_attempts: u16,
        payload_attempts: u16,
        address_done: bool,
        addresses: Vec<u8>,
        payloads: Vec<Vec<u8>>,
        dummies: Vec<u8>,
    }

    impl ScriptedTransfer {
        fn new(address: Script, payload: Script) -> Self {
            Self {
                address,
                payload,
                budget: RetryPolicy::default().max_attempts,
                response: Vec::new(),
                address_attempts: 0,
                payload_attempts: 0,
                address_done: false,
                addresses: Vec::new(),
                payloads: Vec::new(),
                dummies: Vec::new(),
            }
        }

        fn always_ok() -> Self {
            Self::new(Script::FailFirst(0), Script::FailFirst(0))
        }

        fn with_response(mut self, response: &[u8]) -> Self {
            self.response = response.to_vec();
            self
        }

        fn with_budget(mut self, budget: u16) -> Self {
            self.budget = budget;
            self
        }

        fn next_address(&mut self, data: &[u8]) -> TransferStatus {
            assert_eq!(data.len(), 1, "address phase sends a single byte");
            let status = self.address.status(self.address_attempts);
            self.address_attempts += 1;
            self.addresses.push(data[0]);
            // The address phase ends after an OK or once the budget is spent.
            self.address_done = status.is_ok() || self.address_attempts >= self.budget;
            status
        }

        fn next_payload(&mut self) -> TransferStatus {
            self.address_done = true;
            let status = self.payload.status(self.payload_attempts);
            self.payload_attempts += 1;
            status
        }
    }

    impl SpiTransfer for ScriptedTransfer {
        fn transfer_write(&mut self, data: &[u8]) -> TransferStatus {
            if !self.address_done {
                return self.next_address(data);
            }
            let status = self.next_payload();
            self.payloads.push(data.to_vec());
            status
        }

        fn transfer_read(&mut self, buf: &mut [u8], dummy: u8) -> TransferStatus {
            let status = self.next_payload();
            self.dummies.push(dummy);
            if status.is_ok() {
                buf.copy_from_slice(&self.response[..buf.len()]);
            }
            status
        }
    }

    fn framed_pin() -> PinMock {
        PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ])
    }

    fn interface(
        transfer: ScriptedTransfer,
        pin: PinMock,
    ) -> SpiInterface<ScriptedTransfer, PinMock, NoopDelay> {
        SpiInterface::new(transfer, pin, NoopDelay::new(), RetryPolicy::default())
    }

    fn finish(interface: SpiInterface<ScriptedTransfer, PinMock, NoopDelay>) -> ScriptedTransfer {
        let (transfer, mut pin, _) = interface.release();
        pin.done();
        transfer
    }

    #[test]
    fn write_frames_address_and_payload() {
        let mut iface = interface(ScriptedTransfer::always_ok(), framed_pin());

        assert_eq!(iface.write(0x4B, &[0x01, 0x02]), Ok(()));

        let transfer = finish(iface);
        assert_eq!(transfer.addresses, vec![0x4B]);
        assert_eq!(transfer.payloads, vec![vec![0x01, 0x02]]);
    }

    #[test]
    fn write_of_empty_payload_still_runs_both_phases() {
        let mut iface = interface(ScriptedTransfer::always_ok(), framed_pin());

        assert_eq!(iface.write(0x51, &[]), Ok(()));

        let transfer = finish(iface);
        assert_eq!(transfer.addresses, vec![0x51]);
        assert_eq!(transfer.payloads, vec![Vec::<u8>::new()]);
    }

    #[test]
    fn write_rejects_address_with_direction_bit() {
        let mut iface = interface(ScriptedTransfer::always_ok(), PinMock::new(&[]));

        assert_eq!(iface.write(0xC0, &[0x00]), Err(BusError::InvalidRegister));

        let transfer = finish(iface);
        assert!(transfer.addresses.is_empty());
        assert!(transfer.payloads.is_empty());
    }

    #[test]
    fn read_tags_address_and_fills_buffer() {
        let transfer = ScriptedTransfer::always_ok().with_response(&[0x32, 0x00, 0x01]);
        let mut iface = interface(transfer, framed_pin());

        let mut buf = [0u8; 3];
        assert_eq!(iface.read(0x40, &mut buf), Ok(()));
        assert_eq!(buf, [0x32, 0x00, 0x01]);

        let transfer = finish(iface);
        assert_eq!(transfer.addresses, vec![0xC0]);
        assert_eq!(transfer.dummies, vec![0x00]);
    }

    #[test]
    fn read_forces_direction_bit_even_when_already_set() {
        let transfer = ScriptedTransfer::always_ok().with_response(&[0xAA]);
        let mut iface = interface(transfer, framed_pin());

        let mut buf = [0u8; 1];
        assert_eq!(iface.read(0xC2, &mut buf), Ok(()));

        let transfer = finish(iface);
        assert_eq!(transfer.addresses, vec![0xC2]);
    }

    #[test]
    fn read_sends_configured_dummy() {
        let transfer = ScriptedTransfer::always_ok().with_response(&[0x00]);
        let policy = Config::new().read_dummy(0xFF).build().retry_policy();
        let mut iface = SpiInterface::new(transfer, framed_pin(), NoopDelay::new(), policy);

        let mut buf = [0u8; 1];
        assert_eq!(iface.read(0x4C, &mut buf), Ok(()));

        let transfer = finish(iface);
        assert_eq!(transfer.dummies, vec![0xFF]);
    }

    #[test]
    fn payload_failure_exhausts_budget_and_still_deselects() {
        let transfer = ScriptedTransfer::new(Script::FailFirst(0), Script::AlwaysFail);
        let mut iface = interface(transfer, framed_pin());

        assert_eq!(iface.write(0x4C, &[0x00, 0x00]), Err(BusError::Transfer));

        let transfer = finish(iface);
        assert_eq!(transfer.payload_attempts, 100);
    }

    #[test]
    fn read_payload_failure_exhausts_budget() {
        let transfer = ScriptedTransfer::new(Script::FailFirst(0), Script::AlwaysFail);
        let mut iface = interface(transfer, framed_pin());

        let mut buf = [0u8; 2];
        assert_eq!(iface.read(0x42, &mut buf), Err(BusError::Transfer));

        let transfer = finish(iface);
        assert_eq!(transfer.payload_attempts, 100);
    }

    #[test]
    fn transient_payload_failures_are_retried() {
        let transfer = ScriptedTransfer::new(Script::FailFirst(0), Script::FailFirst(7))
            .with_response(&[0x12, 0x34]);
        let mut iface = interface(transfer, framed_pin());

        let mut buf = [0u8; 2];
        assert_eq!(iface.read(0x42, &mut buf), Ok(()));
        assert_eq!(buf, [0x12, 0x34]);

        let transfer = finish(iface);
        assert_eq!(transfer.payload_attempts, 8);
    }

    #[test]
    fn success_on_last_allowed_attempt() {
        let transfer = ScriptedTransfer::new(Script::FailFirst(0), Script::FailFirst(99));
        let mut iface = interface(transfer, framed_pin());

        assert_eq!(iface.write(0x52, &[0x0E, 0x00]), Ok(()));

        let transfer = finish(iface);
        assert_eq!(transfer.payload_attempts, 100);
    }

    #[test]
    fn transient_address_failures_are_retried() {
        let transfer = ScriptedTransfer::new(Script::FailFirst(3), Script::FailFirst(0));
        let mut iface = interface(transfer, framed_pin());

        assert_eq!(iface.write(0x4B, &[0x01, 0x00]), Ok(()));

        let transfer = finish(iface);
        assert_eq!(transfer.address_attempts, 4);
        assert_eq!(transfer.payload_attempts, 1);
    }

    #[test]
    fn address_failure_alone_does_not_fail_the_call() {
        let transfer = ScriptedTransfer::new(Script::AlwaysFail, Script::FailFirst(0));
        let mut iface = interface(transfer, framed_pin());

        assert_eq!(iface.write(0x4B, &[0x01, 0x00]), Ok(()));

        let transfer = finish(iface);
        assert_eq!(transfer.address_attempts, 100);
        assert_eq!(transfer.payload_attempts, 1);
    }

    #[test]
    fn read_address_failure_alone_does_not_fail_the_call() {
        let transfer = ScriptedTransfer::new(Script::AlwaysFail, Script::FailFirst(0))
            .with_response(&[0x32]);
        let mut iface = interface(transfer, framed_pin());

        let mut buf = [0u8; 1];
        assert_eq!(iface.read(0x40, &mut buf), Ok(()));
        assert_eq!(buf, [0x32]);

        let transfer = finish(iface);
        assert_eq!(transfer.address_attempts, 100);
        assert_eq!(transfer.payload_attempts, 1);
    }

    #[test]
    fn read_transient_address_failures_are_retried() {
        let transfer = ScriptedTransfer::new(Script::FailFirst(12), Script::FailFirst(0))
            .with_response(&[0x06]);
        let mut iface = interface(transfer, framed_pin());

        let mut buf = [0u8; 1];
        assert_eq!(iface.read(0x4C, &mut buf), Ok(()));

        let transfer = finish(iface);
        assert_eq!(transfer.address_attempts, 13);
        assert!(transfer.addresses.iter().all(|address| *address == 0xCC));
        assert_eq!(transfer.payload_attempts, 1);
    }

    #[test]
    fn read_of_empty_buffer_still_runs_both_phases() {
        let mut iface = interface(ScriptedTransfer::always_ok(), framed_pin());

        assert_eq!(iface.read(0x42, &mut []), Ok(()));

        let transfer = finish(iface);
        assert_eq!(transfer.addresses, vec![0xC2]);
        assert_eq!(transfer.payload_attempts, 1);
        assert_eq!(transfer.dummies, vec![0x00]);
    }

    #[test]
    fn zero_attempt_policy_still_tries_each_phase_once() {
        let transfer = ScriptedTransfer::new(Script::FailFirst(0), Script::AlwaysFail)
            .with_budget(1);
        let policy = RetryPolicy {
            max_attempts: 0,
            read_dummy: 0x00,
        };
        let mut iface = SpiInterface::new(transfer, framed_pin(), NoopDelay::new(), policy);

        assert_eq!(iface.write(0x4C, &[0x00, 0x00]), Err(BusError::Transfer));

        let transfer = finish(iface);
        assert_eq!(transfer.address_attempts, 1);
        assert_eq!(transfer.payload_attempts, 1);
    }

    #[test]
    fn custom_budget_bounds_attempts() {
        let transfer = ScriptedTransfer::new(Script::FailFirst(0), Script::AlwaysFail)
            .with_response(&[0x00])
            .with_budget(5);
        let policy = Config::new().max_attempts(5).build().retry_policy();
        let mut iface = SpiInterface::new(transfer, framed_pin(), NoopDelay::new(), policy);

        let mut buf = [0u8; 1];
        assert_eq!(iface.read(0x40, &mut buf), Err(BusError::Transfer));

        let transfer = finish(iface);
        assert_eq!(transfer.payload_attempts, 5);
    }

    #[test]
    fn retry_stops_on_ok_or_budget() {
        let (status, attempts) = retry(100, || TransferStatus::Error);
        assert_eq!((status, attempts), (TransferStatus::Error, 100));

        let (status, attempts) = retry(100, || TransferStatus::Ok);
        assert_eq!((status, attempts), (TransferStatus::Ok, 1));

        let mut calls = 0;
        let (status, attempts) = retry(100, || {
            calls += 1;
            if calls == 1 {
                TransferStatus::NoChange
            } else {
                TransferStatus::Ok
            }
        });
        assert_eq!((status, attempts), (TransferStatus::Ok, 2));
    }

    #[test]
    fn configure_slave_idles_the_line_high() {
        let pin = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let mut iface = interface(ScriptedTransfer::always_ok(), pin);

        iface.configure_slave();

        finish(iface);
    }

    #[test]
    fn register_helpers_go_through_the_transport() {
        let pin = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let transfer = ScriptedTransfer::always_ok().with_response(&[0x06]);
        let mut iface = interface(transfer, pin);

        assert_eq!(iface.read_register(0x4C), Ok(0x06));

        finish(iface);
    }
}
