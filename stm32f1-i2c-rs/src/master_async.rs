use crate::{
    CLOCK_SETTLE_MS, Event, I2cMasterBuilder, I2cResult, Speed, Timing,
    bus::{Bus, Direction, Ending, check_address, check_read},
};
use embedded_hal_async::delay::DelayNs;
use embedded_i2c_regs::RegisterAccess;
use log::debug;

impl I2cMasterBuilder {
    /// Bring up the peripheral and return an async master.
    ///
    /// Same sequence as [`I2cMasterBuilder::build`], with the clock settle time
    /// and the poll interval awaited on an async timer.
    pub async fn build_async<R: RegisterAccess, D: DelayNs>(
        self,
        regs: R,
        delay: D,
    ) -> I2cResult<I2cMasterAsync<R, D>> {
        let mut dev = I2cMasterAsync {
            bus: self.bus(regs)?,
            delay,
        };
        dev.configure().await;
        Ok(dev)
    }
}

/// Async I2C master.
///
/// Register accesses stay synchronous; only the waits between status polls
/// yield to the executor.
pub struct I2cMasterAsync<R, D> {
    pub(crate) bus: Bus<R>,
    pub(crate) delay: D,
}

impl<R, D> I2cMasterAsync<R, D> {
    /// Timing currently programmed.
    pub fn timing(&self) -> Timing {
        self.bus.timing
    }

    /// Give back the register block and the timer.
    pub fn release(self) -> (R, D) {
        (self.bus.regs, self.delay)
    }
}

impl<R: RegisterAccess, D: DelayNs> I2cMasterAsync<R, D> {
    /// See [`I2cMaster::init`](crate::I2cMaster::init).
    pub async fn init(&mut self, speed: Speed, pclk1_mhz: u8) -> I2cResult<()> {
        self.bus.timing = Timing::compute(speed, pclk1_mhz)?;
        self.configure().await;
        Ok(())
    }

    async fn configure(&mut self) {
        self.bus.enable_clocks();
        self.delay.delay_ms(CLOCK_SETTLE_MS).await;
        self.bus.configure();
    }

    /// See [`I2cMaster::write_register`](crate::I2cMaster::write_register).
    pub async fn write_register(&mut self, address: u8, register: u8, value: u8) -> I2cResult<()> {
        check_address(address)?;
        debug!(
            "i2c: write {:#04x}[{:#04x}] = {:#04x}",
            address, register, value
        );
        self.begin(address, Direction::Write).await?;
        self.transmit(&[register, value]).await?;
        self.bus.stop();
        Ok(())
    }

    /// See [`I2cMaster::read_registers`](crate::I2cMaster::read_registers).
    pub async fn read_registers(
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
        self.begin(address, Direction::Write).await?;
        self.transmit(&[register]).await?;
        self.begin(address, Direction::Read).await?;
        self.receive(&mut buffer[..count], Ending::Stop).await?;
        Ok(count)
    }

    pub(crate) async fn wait_for(&mut self, event: Event) -> I2cResult<()> {
        let mut tries = 0;
        loop {
            if self.bus.poll(event)? {
                return Ok(());
            }
            if tries >= self.bus.retries {
                return Err(self.bus.timed_out(event));
            }
            tries += 1;
            self.delay.delay_ns(self.bus.poll_interval_ns).await;
        }
    }

    pub(crate) async fn begin(&mut self, address: u8, direction: Direction) -> I2cResult<()> {
        self.bus.start();
        self.wait_for(Event::StartGenerated).await?;
        self.bus.send_address(address, direction);
        self.wait_for(Event::AddressAcknowledged).await?;
        self.bus.clear_address_flag();
        Ok(())
    }

    pub(crate) async fn transmit(&mut self, bytes: &[u8]) -> I2cResult<()> {
        for &byte in bytes {
            self.bus.send(byte);
            self.wait_for(Event::TransmitEmpty).await?;
            self.wait_for(Event::ByteTransferred).await?;
        }
        Ok(())
    }

    pub(crate) async fn receive(&mut self, buffer: &mut [u8], ending: Ending) -> I2cResult<()> {
        self.bus.enable_ack();
        let last = buffer.len().saturating_sub(1);
        for (idx, slot) in buffer.iter_mut().enumerate() {
            if idx == last {
                self.bus.end_reception(ending);
            }
            self.wait_for(Event::ReceiveNotEmpty).await?;
            *slot = self.bus.receive();
        }
        Ok(())
    }
}
