use crate::{
    Error, I2cMasterAsync,
    bus::{Direction, Ending, check_address, check_operations},
};
use embedded_hal::i2c::{ErrorType, Operation, SevenBitAddress};
use embedded_hal_async::{delay::DelayNs, i2c::I2c};
use embedded_i2c_regs::RegisterAccess;

impl<R, D> ErrorType for I2cMasterAsync<R, D> {
    type Error = Error;
}

impl<R: RegisterAccess, D: DelayNs> I2c<SevenBitAddress> for I2cMasterAsync<R, D> {
    async fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        check_address(address)?;
        check_operations(operations)?;
        let mut current = None;
        for idx in 0..operations.len() {
            let ending = Ending::before(operations.get(idx + 1));
            let direction = Direction::of(&operations[idx]);
            if current != Some(direction) {
                self.begin(address, direction).await?;
                current = Some(direction);
            }
            match &mut operations[idx] {
                Operation::Write(bytes) => self.transmit(bytes).await?,
                Operation::Read(buffer) => self.receive(buffer, ending).await?,
            }
        }
        if current == Some(Direction::Write) {
            self.bus.stop();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{I2cMasterBuilder, Instance};
    use embassy_futures::block_on;
    use embedded_hal_async::i2c::I2c;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use i2c_sim::{BusEvent, RegisterFile, SimPeripheral};

    #[test]
    fn async_write_read() {
        let mut sim = SimPeripheral::new(Instance::I2c1)
            .with_target(RegisterFile::new(0x1d).with_contents(0x0f, &[0x49]));
        let buf = block_on(async {
            let mut dev = I2cMasterBuilder::default()
                .build_async(&mut sim, NoopDelay::new())
                .await
                .unwrap();
            let mut buf = [0u8; 1];
            dev.write_read(0x1d, &[0x0f], &mut buf).await.unwrap();
            buf
        });
        assert_eq!(buf, [0x49]);
        assert!(sim.events().contains(&BusEvent::RepeatedStart));
    }
}
