use crate::{ArgumentError, Error, Event, I2cResult, Timing, traits::TypedAccess};
use embedded_hal::i2c::Operation;
use embedded_i2c_regs::{Instance, RCC_APB2ENR_IOPBEN, Reg, RegisterAccess};
use log::{debug, trace, warn};

/// Transfer direction, encoded in bit 0 of the address byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Write,
    Read,
}

impl Direction {
    pub(crate) fn of(op: &Operation<'_>) -> Self {
        match op {
            Operation::Write(_) => Direction::Write,
            Operation::Read(_) => Direction::Read,
        }
    }

    fn address_byte(self, address: u8) -> u8 {
        (address << 1) | (self == Direction::Read) as u8
    }
}

/// What happens around the last byte of a reception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ending {
    /// Acknowledge it, more bytes are read without a new start.
    Continue,
    /// Not-acknowledge it, a repeated start follows.
    Restart,
    /// Not-acknowledge it and stop.
    Stop,
}

impl Ending {
    /// Ending of a read operation given the operation that follows it.
    pub(crate) fn before(next: Option<&Operation<'_>>) -> Self {
        match next.map(Direction::of) {
            Some(Direction::Read) => Ending::Continue,
            Some(Direction::Write) => Ending::Restart,
            None => Ending::Stop,
        }
    }
}

pub(crate) fn check_address(address: u8) -> Result<(), ArgumentError> {
    if address > 0x7f {
        Err(ArgumentError::AddressOutOfRange(address))
    } else {
        Ok(())
    }
}

pub(crate) fn check_read(count: usize, capacity: usize) -> Result<(), ArgumentError> {
    if count == 0 {
        Err(ArgumentError::ZeroLength)
    } else if capacity < count {
        Err(ArgumentError::BufferTooSmall {
            requested: count,
            capacity,
        })
    } else {
        Ok(())
    }
}

pub(crate) fn check_operations(operations: &[Operation<'_>]) -> Result<(), ArgumentError> {
    if operations
        .iter()
        .any(|op| matches!(op, Operation::Read(buf) if buf.is_empty()))
    {
        Err(ArgumentError::ZeroLength)
    } else {
        Ok(())
    }
}

/// Register level state shared by the blocking and async masters.
///
/// Nothing in here waits; the masters poll [`Bus::poll`] with their own delay.
pub(crate) struct Bus<R> {
    pub(crate) regs: R,
    pub(crate) instance: Instance,
    pub(crate) retries: u32,
    pub(crate) poll_interval_ns: u32,
    pub(crate) timing: Timing,
}

impl<R: RegisterAccess> Bus<R> {
    /// Gate on the peripheral clock and the GPIOB clock.
    pub(crate) fn enable_clocks(&mut self) {
        let enable = self.instance.clock_enable();
        self.regs.modify(Reg::Apb1enr, |v| v | enable);
        self.regs.modify(Reg::Apb2enr, |v| v | RCC_APB2ENR_IOPBEN);
    }

    /// Pins, reset, timing, enable. Clocks must be running and settled.
    pub(crate) fn configure(&mut self) {
        let timing = self.timing;
        let pins = self.instance.pins();
        self.regs.modify(pins.config, |v| pins.configure(v));

        self.regs.update_cr1(|cr1| cr1.with_swrst(true));
        self.regs.update_cr1(|cr1| cr1.with_swrst(false));

        self.regs.update_cr2(|cr2| timing.cr2(cr2));
        self.regs
            .write(Reg::Ccr, timing.ccr_register().into_bits() as u32);
        self.regs
            .write(Reg::Trise, timing.trise_register().into_bits() as u32);

        self.regs.update_cr1(|cr1| cr1.with_pe(true));
        debug!(
            "i2c: {:?} enabled, {:?} FREQ={} CCR={} TRISE={}",
            self.instance, timing.speed, timing.freq_mhz, timing.ccr, timing.trise
        );
    }

    /// Sample SR1 once.
    ///
    /// Returns whether `event` has occurred. An acknowledge failure clears AF and
    /// releases the bus with a stop; a lost arbitration clears ARLO and leaves the
    /// bus to the winning master.
    pub(crate) fn poll(&mut self, event: Event) -> I2cResult<bool> {
        let sr1 = self.regs.sr1();
        if sr1.af() {
            self.regs.write_sr1(sr1.with_af(false));
            self.stop();
            warn!("i2c: not acknowledged waiting for {:?}", event);
            return Err(Error::NotAcknowledged(event.nack_source()));
        }
        if sr1.arlo() {
            self.regs.write_sr1(sr1.with_arlo(false));
            warn!("i2c: arbitration lost waiting for {:?}", event);
            return Err(Error::ArbitrationLost);
        }
        Ok(event.is_set(sr1))
    }

    /// Give up on `event`: release the bus and report the timeout.
    pub(crate) fn timed_out(&mut self, event: Event) -> Error {
        warn!(
            "i2c: {:?} not seen after {} retries",
            event, self.retries
        );
        self.stop();
        Error::Timeout(event)
    }

    /// Start, or repeated start if the bus is already owned.
    pub(crate) fn start(&mut self) {
        trace!("i2c: start");
        self.regs.update_cr1(|cr1| cr1.with_start(true));
    }

    pub(crate) fn stop(&mut self) {
        trace!("i2c: stop");
        self.regs.update_cr1(|cr1| cr1.with_stop(true));
    }

    pub(crate) fn send_address(&mut self, address: u8, direction: Direction) {
        trace!("i2c: address {:#04x} {:?}", address, direction);
        self.regs.write_data(direction.address_byte(address));
    }

    /// ADDR is cleared by reading SR2; the value itself is of no use.
    pub(crate) fn clear_address_flag(&mut self) {
        let _ = self.regs.sr2();
    }

    pub(crate) fn send(&mut self, byte: u8) {
        trace!("i2c: tx {:#04x}", byte);
        self.regs.write_data(byte);
    }

    pub(crate) fn receive(&mut self) -> u8 {
        let byte = self.regs.read_data();
        trace!("i2c: rx {:#04x}", byte);
        byte
    }

    pub(crate) fn enable_ack(&mut self) {
        self.regs.update_cr1(|cr1| cr1.with_ack(true));
    }

    /// Set up the acknowledge and bus condition for the last byte of a reception.
    ///
    /// Must be called before that byte is received: the acknowledge bit is
    /// sampled as the byte completes.
    pub(crate) fn end_reception(&mut self, ending: Ending) {
        match ending {
            Ending::Continue => {}
            Ending::Restart => self.regs.update_cr1(|cr1| cr1.with_ack(false)),
            Ending::Stop => self
                .regs
                .update_cr1(|cr1| cr1.with_ack(false).with_stop(true)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_byte_appends_direction() {
        assert_eq!(Direction::Write.address_byte(0x50), 0xa0);
        assert_eq!(Direction::Read.address_byte(0x50), 0xa1);
        assert_eq!(Direction::Read.address_byte(0x7f), 0xff);
    }

    #[test]
    fn read_arguments() {
        assert_eq!(check_read(0, 4), Err(ArgumentError::ZeroLength));
        assert_eq!(
            check_read(5, 4),
            Err(ArgumentError::BufferTooSmall {
                requested: 5,
                capacity: 4
            })
        );
        assert_eq!(check_read(4, 4), Ok(()));
        assert_eq!(check_address(0x80), Err(ArgumentError::AddressOutOfRange(0x80)));
        assert_eq!(check_address(0x7f), Ok(()));
    }

    #[test]
    fn read_endings() {
        let mut buf = [0u8; 2];
        let write = [0u8; 1];
        assert_eq!(Ending::before(None), Ending::Stop);
        assert_eq!(
            Ending::before(Some(&Operation::Write(&write))),
            Ending::Restart
        );
        assert_eq!(
            Ending::before(Some(&Operation::Read(&mut buf))),
            Ending::Continue
        );
    }
}
