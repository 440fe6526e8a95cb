use crate::{
    Error, I2cMaster,
    bus::{Direction, Ending, check_address, check_operations},
};
use embedded_hal::{
    delay::DelayNs,
    i2c::{ErrorType, I2c, Operation, SevenBitAddress},
};
use embedded_i2c_regs::RegisterAccess;

impl<R, D> ErrorType for I2cMaster<R, D> {
    type Error = Error;
}

impl<R: RegisterAccess, D: DelayNs> I2c<SevenBitAddress> for I2cMaster<R, D> {
    fn transaction(
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
                self.begin(address, direction)?;
                current = Some(direction);
            }
            match &mut operations[idx] {
                Operation::Write(bytes) => self.transmit(bytes)?,
                Operation::Read(buffer) => self.receive(buffer, ending)?,
            }
        }
        if current == Some(Direction::Write) {
            self.bus.stop();
        }
        Ok(())
    }
}
