use crate::{
    CLOCK_SETTLE_MS, ConfigError, DEFAULT_POLL_INTERVAL_NS, DEFAULT_RETRIES, Event, I2cResult,
    Instance, Speed, Timing,
    bus::{Bus, Direction, Ending, check_address, check_read},
};
use embedded_hal::delay::DelayNs;
use embedded_i2c_regs::RegisterAccess;
use log::debug;

/// Builder for an I2C master with custom timing and wait budget.
#[derive(Debug, Clone, Copy)]
pub struct I2cMasterBuilder {
    pub(crate) speed: Speed,
    pub(crate) input_clock_mhz: u8,
    pub(crate) retries: u32,
    pub(crate) poll_interval_ns: u32,
    pub(crate) instance: Instance,
}

impl Default for I2cMasterBuilder {
    fn default() -> Self {
        I2cMasterBuilder {
            speed: Speed::Standard,
            input_clock_mhz: 8,
            retries: DEFAULT_RETRIES,
            poll_interval_ns: DEFAULT_POLL_INTERVAL_NS,
            instance: Instance::I2c1,
        }
    }
}

impl I2cMasterBuilder {
    /// Sets the bus speed class.
    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    /// Sets the peripheral input clock (PCLK1) in MHz.
    pub fn with_input_clock_mhz(mut self, mhz: u8) -> Self {
        self.input_clock_mhz = mhz;
        self
    }

    /// Sets the retry count.
    ///
    /// Every wait on a status flag samples the status register at most
    /// `retries + 1` times before giving up with [`Error::Timeout`](crate::Error::Timeout).
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the delay between two samples of the status register, in ns.
    pub fn with_poll_interval_ns(mut self, ns: u32) -> Self {
        self.poll_interval_ns = ns;
        self
    }

    /// Selects the peripheral instance.
    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instance = instance;
        self
    }

    /// Timing the builder would program.
    pub fn timing(&self) -> Result<Timing, ConfigError> {
        Timing::compute(self.speed, self.input_clock_mhz)
    }

    pub(crate) fn bus<R>(&self, regs: R) -> I2cResult<Bus<R>> {
        Ok(Bus {
            regs,
            instance: self.instance,
            retries: self.retries,
            poll_interval_ns: self.poll_interval_ns,
            timing: self.timing()?,
        })
    }

    /// Bring up the peripheral and return a blocking master.
    ///
    /// The timing is validated before any register is touched, so an
    /// [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration) leaves
    /// the hardware as it was.
    pub fn build<R: RegisterAccess, D: DelayNs>(
        self,
        regs: R,
        delay: D,
    ) -> I2cResult<I2cMaster<R, D>> {
        let mut dev = I2cMaster {
            bus: self.bus(regs)?,
            delay,
        };
        dev.configure();
        Ok(dev)
    }
}

/// Blocking I2C master.
///
/// Owns the register block (anything implementing [`RegisterAccess`]) and a
/// timer implementing [`DelayNs`], used for the clock settle time and between
/// status polls.
pub struct I2cMaster<R, D> {
    pub(crate) bus: Bus<R>,
    pub(crate) delay: D,
}

impl<R, D> I2cMaster<R, D> {
    /// Timing currently programmed.
    pub fn timing(&self) -> Timing {
        self.bus.timing
    }

    /// Give back the register block and the timer.
    pub fn release(self) -> (R, D) {
        (self.bus.regs, self.delay)
    }
}

impl<R: RegisterAccess, D: DelayNs> I2cMaster<R, D> {
    /// Re-run the bring-up sequence with a new speed and input clock.
    ///
    /// On [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration) no
    /// register is written and the previous timing stays in effect.
    pub fn init(&mut self, speed: Speed, pclk1_mhz: u8) -> I2cResult<()> {
        self.bus.timing = Timing::compute(speed, pclk1_mhz)?;
        self.configure();
        Ok(())
    }

    fn configure(&mut self) {
        self.bus.enable_clocks();
        self.delay.delay_ms(CLOCK_SETTLE_MS);
        self.bus.configure();
    }

    /// Write one byte into a register of the slave at `address`.
    ///
    /// Bus sequence: START, address+W, register, value, STOP. Each data byte
    /// waits for TXE and then BTF.
    pub fn write_register(&mut self, address: u8, register: u8, value: u8) -> I2cResult<()> {
        check_address(address)?;
        debug!(
            "i2c: write {:#04x}[{:#04x}] = {:#04x}",
            address, register, value
        );
        self.begin(address, Direction::Write)?;
        self.transmit(&[register, value])?;
        self.bus.stop();
        Ok(())
    }

    /// Read `count` consecutive registers of the slave at `address`, starting at `register`.
    ///
    /// The register address is written, then a repeated start turns the bus
    /// around for reception. The last byte is not acknowledged and STOP is
    /// requested before it arrives. Fills `buffer[..count]` and returns `count`.
    ///
    /// On `Err` the transfer stopped part way: `buffer[..count]` may hold some of
    /// the received bytes and its contents are unspecified.
    pub fn read_registers(
        &mut self,
        address: u8,
        register: u8,
        count: usize,
        buffer: &mut [u8],
    ) -> I2cResult<usize> {
        check_address(address)?;
        check_read(count, buffer.len())?;
        debug!(
            "i2c: read {} from {:#04x}[{:#04x}]",
            count, address, register
        );
        self.begin(address, Direction::Write)?;
        self.transmit(&[register])?;
        self.begin(address, Direction::Read)?;
        self.receive(&mut buffer[..count], Ending::Stop)?;
        Ok(count)
    }

    /// Wait until `event` shows up in SR1, sampling at most `retries + 1` times.
    pub(crate) fn wait_for(&mut self, event: Event) -> I2cResult<()> {
        let mut tries = 0;
        loop {
            if self.bus.poll(event)? {
                return Ok(());
            }
            if tries >= self.bus.retries {
                return Err(self.bus.timed_out(event));
            }
            tries += 1;
            self.delay.delay_ns(self.bus.poll_interval_ns);
        }
    }

    /// (Repeated) start and address phase, leaving ADDR cleared.
    pub(crate) fn begin(&mut self, address: u8, direction: Direction) -> I2cResult<()> {
        self.bus.start();
        self.wait_for(Event::StartGenerated)?;
        self.bus.send_address(address, direction);
        self.wait_for(Event::AddressAcknowledged)?;
        self.bus.clear_address_flag();
        Ok(())
    }

    pub(crate) fn transmit(&mut self, bytes: &[u8]) -> I2cResult<()> {
        for &byte in bytes {
            self.bus.send(byte);
            self.wait_for(Event::TransmitEmpty)?;
            self.wait_for(Event::ByteTransferred)?;
        }
        Ok(())
    }

    pub(crate) fn receive(&mut self, buffer: &mut [u8], ending: Ending) -> I2cResult<()> {
        self.bus.enable_ack();
        let last = buffer.len().saturating_sub(1);
        for (idx, slot) in buffer.iter_mut().enumerate() {
            if idx == last {
                self.bus.end_reception(ending);
            }
            self.wait_for(Event::ReceiveNotEmpty)?;
            *slot = self.bus.receive();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgumentError, Error};
    use embedded_hal::i2c::{Error as _, ErrorKind, NoAcknowledgeSource};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_i2c_regs::{Cr1, Reg, Sr1};
    use i2c_sim::{Access, BusEvent, Fault, RegisterFile, SimPeripheral};

    const EEPROM: u8 = 0x50;

    #[derive(Default)]
    struct CountingDelay {
        ms: u32,
        polls: u32,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, _ns: u32) {
            self.polls += 1;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.ms += ms;
        }
    }

    fn sim() -> SimPeripheral {
        SimPeripheral::new(Instance::I2c1).with_target(RegisterFile::new(EEPROM))
    }

    fn writes(sim: &SimPeripheral) -> Vec<(Reg, u32)> {
        sim.accesses()
            .iter()
            .filter_map(|a| match a {
                Access::Write(reg, value) => Some((*reg, *value)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn bring_up_sequence() {
        let mut sim = sim();
        let mut delay = CountingDelay::default();
        let dev = I2cMasterBuilder::default()
            .build(&mut sim, &mut delay)
            .unwrap();
        assert_eq!(dev.timing().ccr, 625);
        drop(dev);
        assert_eq!(delay.ms, CLOCK_SETTLE_MS);
        assert_eq!(
            writes(&sim),
            [
                (Reg::Apb1enr, 1 << 21),
                (Reg::Apb2enr, 1 << 3),
                (Reg::Crl, 0xff44_4444),
                (Reg::Cr1, 1 << 15),
                (Reg::Cr1, 0),
                (Reg::Cr2, 8),
                (Reg::Ccr, 625),
                (Reg::Trise, 9),
                (Reg::Cr1, 1),
            ]
        );
    }

    #[test]
    fn second_instance_uses_its_own_gate_and_pins() {
        let mut sim = SimPeripheral::new(Instance::I2c2);
        I2cMasterBuilder::default()
            .with_instance(Instance::I2c2)
            .with_speed(Speed::Fast)
            .with_input_clock_mhz(36)
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        let writes = writes(&sim);
        assert_eq!(writes[0], (Reg::Apb1enr, 1 << 22));
        assert_eq!(writes[2], (Reg::Crh, 0x4444_ff44));
        assert!(writes.contains(&(Reg::Ccr, 0xc003)));
        assert!(writes.contains(&(Reg::Trise, 12)));
    }

    #[test]
    fn invalid_timing_touches_nothing() {
        let mut sim = sim();
        let res = I2cMasterBuilder::default()
            .with_speed(Speed::Fast)
            .with_input_clock_mhz(8)
            .build(&mut sim, NoopDelay::new());
        assert!(matches!(
            res,
            Err(Error::InvalidConfiguration(ConfigError::ZeroDivider))
        ));
        assert!(sim.accesses().is_empty());

        let mut dev = I2cMasterBuilder::default()
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        let before = dev.timing();
        assert_eq!(
            dev.init(Speed::Standard, 40),
            Err(Error::InvalidConfiguration(ConfigError::ClockOutOfRange(40)))
        );
        assert_eq!(dev.timing(), before);
        dev.init(Speed::Fast, 36).unwrap();
        assert_eq!(dev.timing().speed, Speed::Fast);
    }

    #[test]
    fn write_then_read_back() {
        let mut sim = sim();
        let mut dev = I2cMasterBuilder::default()
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        let payload: [u8; 6] = rand::random();
        for (offset, value) in payload.iter().enumerate() {
            dev.write_register(EEPROM, 0x10 + offset as u8, *value)
                .unwrap();
        }
        let mut buf = [0u8; 8];
        assert_eq!(dev.read_registers(EEPROM, 0x10, 6, &mut buf), Ok(6));
        assert_eq!(buf[..6], payload);
        assert_eq!(buf[6..], [0, 0]);
    }

    #[test]
    fn write_bus_sequence() {
        let mut sim = sim();
        let mut dev = I2cMasterBuilder::default()
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        sim_clear(&mut dev);
        dev.write_register(EEPROM, 0x20, 0x5a).unwrap();
        drop(dev);
        assert_eq!(
            sim.events(),
            [
                BusEvent::Start,
                BusEvent::Address {
                    address: EEPROM,
                    read: false,
                    acked: true
                },
                BusEvent::Write {
                    value: 0x20,
                    acked: true
                },
                BusEvent::Write {
                    value: 0x5a,
                    acked: true
                },
                BusEvent::Stop,
            ]
        );
    }

    fn sim_clear<D>(dev: &mut I2cMaster<&mut SimPeripheral, D>) {
        dev.bus.regs.clear_log();
    }

    #[test]
    fn single_byte_read_nacks_and_stops() {
        let mut sim = SimPeripheral::new(Instance::I2c1)
            .with_target(RegisterFile::new(EEPROM).with_contents(0x30, &[0xa5]));
        let mut dev = I2cMasterBuilder::default()
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        sim_clear(&mut dev);
        let mut buf = [0u8; 1];
        dev.read_registers(EEPROM, 0x30, 1, &mut buf).unwrap();
        drop(dev);
        assert_eq!(buf, [0xa5]);
        assert_eq!(
            sim.events(),
            [
                BusEvent::Start,
                BusEvent::Address {
                    address: EEPROM,
                    read: false,
                    acked: true
                },
                BusEvent::Write {
                    value: 0x30,
                    acked: true
                },
                BusEvent::RepeatedStart,
                BusEvent::Address {
                    address: EEPROM,
                    read: true,
                    acked: true
                },
                BusEvent::Read {
                    value: 0xa5,
                    acked: false
                },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn multi_byte_read_acks_all_but_last() {
        let mut sim = SimPeripheral::new(Instance::I2c1)
            .with_target(RegisterFile::new(EEPROM).with_contents(0, &[1, 2, 3, 4]));
        let mut dev = I2cMasterBuilder::default()
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        sim_clear(&mut dev);
        let mut buf = [0u8; 4];
        dev.read_registers(EEPROM, 0, 4, &mut buf).unwrap();
        drop(dev);
        assert_eq!(buf, [1, 2, 3, 4]);
        let reads: Vec<_> = sim
            .events()
            .iter()
            .filter_map(|e| match e {
                BusEvent::Read { value, acked } => Some((*value, *acked)),
                _ => None,
            })
            .collect();
        assert_eq!(reads, [(1, true), (2, true), (3, true), (4, false)]);
        assert_eq!(sim.events().last(), Some(&BusEvent::Stop));

        // ACK off and STOP on are requested before the last DR read.
        let accesses = sim.accesses();
        let stop_at = accesses
            .iter()
            .position(|a| {
                matches!(a, Access::Write(Reg::Cr1, v)
                    if Cr1::from_bits(*v as u16).stop() && !Cr1::from_bits(*v as u16).ack())
            })
            .unwrap();
        let last_read = accesses
            .iter()
            .rposition(|a| matches!(a, Access::Read(Reg::Dr, _)))
            .unwrap();
        assert!(stop_at < last_read);
        let dr_reads_before_stop = accesses[..stop_at]
            .iter()
            .filter(|a| matches!(a, Access::Read(Reg::Dr, _)))
            .count();
        assert_eq!(dr_reads_before_stop, 3);
    }

    #[test]
    fn absent_slave_is_not_acknowledged() {
        let mut sim = sim();
        let mut dev = I2cMasterBuilder::default()
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        assert_eq!(
            dev.write_register(0x51, 0, 0),
            Err(Error::NotAcknowledged(NoAcknowledgeSource::Address))
        );
        // The bus was released and is usable again.
        dev.write_register(EEPROM, 0, 1).unwrap();
        drop(dev);
        assert!(sim.events().contains(&BusEvent::Address {
            address: 0x51,
            read: false,
            acked: false
        }));
    }

    #[test]
    fn refused_data_is_not_acknowledged() {
        let mut sim = SimPeripheral::new(Instance::I2c1)
            .with_target(RegisterFile::new(EEPROM).write_protected());
        let mut dev = I2cMasterBuilder::default()
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        assert_eq!(
            dev.write_register(EEPROM, 3, 3),
            Err(Error::NotAcknowledged(NoAcknowledgeSource::Data))
        );
        drop(dev);
        assert_eq!(sim.events().last(), Some(&BusEvent::Stop));
    }

    #[test]
    fn stalled_address_times_out_within_budget() {
        let mut sim = sim().with_fault(Fault::AddressStall);
        let mut delay = CountingDelay::default();
        let mut dev = I2cMasterBuilder::default()
            .with_retries(25)
            .build(&mut sim, &mut delay)
            .unwrap();
        assert_eq!(
            dev.write_register(EEPROM, 0, 0),
            Err(Error::Timeout(Event::AddressAcknowledged))
        );
        drop(dev);
        assert_eq!(delay.polls, 25);
        assert_eq!(sim.events().last(), Some(&BusEvent::Stop));
    }

    #[test]
    fn stalled_data_times_out() {
        let mut sim = sim().with_fault(Fault::DataStall);
        let mut dev = I2cMasterBuilder::default()
            .with_retries(3)
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(
            dev.read_registers(EEPROM, 0, 2, &mut buf),
            Err(Error::Timeout(Event::TransmitEmpty))
        );
    }

    #[test]
    fn missing_start_times_out() {
        let mut sim = sim().with_fault(Fault::NoStart);
        let mut dev = I2cMasterBuilder::default()
            .with_retries(0)
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        assert_eq!(
            dev.write_register(EEPROM, 0, 0),
            Err(Error::Timeout(Event::StartGenerated))
        );
    }

    #[test]
    fn latency_up_to_retries_is_tolerated() {
        let mut sim = sim().with_latency(4);
        let mut dev = I2cMasterBuilder::default()
            .with_retries(4)
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        dev.write_register(EEPROM, 1, 2).unwrap();
        let mut buf = [0u8; 1];
        dev.read_registers(EEPROM, 1, 1, &mut buf).unwrap();
        assert_eq!(buf, [2]);
        drop(dev);

        let mut sim = sim.with_latency(5);
        let mut dev = I2cMasterBuilder::default()
            .with_retries(4)
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        assert_eq!(
            dev.write_register(EEPROM, 1, 2),
            Err(Error::Timeout(Event::StartGenerated))
        );
    }

    #[test]
    fn bad_arguments_touch_nothing() {
        let mut sim = sim();
        let mut dev = I2cMasterBuilder::default()
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        sim_clear(&mut dev);
        let mut buf = [0u8; 4];
        assert_eq!(
            dev.read_registers(EEPROM, 0, 0, &mut buf),
            Err(Error::InvalidArgument(ArgumentError::ZeroLength))
        );
        assert_eq!(
            dev.read_registers(EEPROM, 0, 5, &mut buf),
            Err(Error::InvalidArgument(ArgumentError::BufferTooSmall {
                requested: 5,
                capacity: 4
            }))
        );
        assert_eq!(
            dev.write_register(0xa0, 0, 0),
            Err(Error::InvalidArgument(ArgumentError::AddressOutOfRange(
                0xa0
            )))
        );
        drop(dev);
        assert!(sim.accesses().is_empty());
        assert!(sim.events().is_empty());
    }

    #[test]
    fn release_returns_parts() {
        let sim = sim();
        let dev = I2cMasterBuilder::default()
            .build(sim, NoopDelay::new())
            .unwrap();
        let (sim, _delay) = dev.release();
        assert!(!sim.accesses().is_empty());
    }

    #[test]
    fn lost_arbitration_clears_arlo_without_stop() {
        let mut sim = sim().with_fault(Fault::ArbitrationLoss);
        let mut dev = I2cMasterBuilder::default()
            .build(&mut sim, NoopDelay::new())
            .unwrap();
        sim_clear(&mut dev);
        let err = dev.write_register(EEPROM, 0, 0).unwrap_err();
        assert_eq!(err, Error::ArbitrationLost);
        assert_eq!(err.kind(), ErrorKind::ArbitrationLoss);
        drop(dev);

        let sr1_writes: Vec<_> = sim
            .accesses()
            .iter()
            .filter_map(|a| match a {
                Access::Write(Reg::Sr1, v) => Some(Sr1::from_bits(*v as u16)),
                _ => None,
            })
            .collect();
        assert_eq!(sr1_writes.len(), 1);
        assert!(!sr1_writes[0].arlo());
        assert!(!Sr1::from_bits(sim.read(Reg::Sr1) as u16).arlo());
        assert_eq!(sim.events(), [BusEvent::Start]);
    }

    /// Lets the first received byte through, then stalls the bus.
    struct StallAfterFirstByte<'a>(&'a mut SimPeripheral);

    impl RegisterAccess for StallAfterFirstByte<'_> {
        fn read(&mut self, reg: Reg) -> u32 {
            if reg == Reg::Dr {
                self.0.set_fault(Some(Fault::DataStall));
            }
            self.0.read(reg)
        }

        fn write(&mut self, reg: Reg, value: u32) {
            self.0.write(reg, value)
        }
    }

    #[test]
    fn interrupted_read_reports_timeout() {
        let mut sim = SimPeripheral::new(Instance::I2c1)
            .with_target(RegisterFile::new(EEPROM).with_contents(0, &[7, 8, 9]));
        let mut dev = I2cMasterBuilder::default()
            .with_retries(3)
            .build(StallAfterFirstByte(&mut sim), NoopDelay::new())
            .unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(
            dev.read_registers(EEPROM, 0, 3, &mut buf),
            Err(Error::Timeout(Event::ReceiveNotEmpty))
        );
        assert_eq!(buf[0], 7);
        drop(dev);
        assert_eq!(sim.events().last(), Some(&BusEvent::Stop));
    }
}
