use embedded_i2c_regs::{Cr1, Cr2, Reg, RegisterAccess, Sr1, Sr2};

/// Typed views over the I2C registers the master polls and drives.
pub(crate) trait TypedAccess: RegisterAccess {
    fn cr1(&mut self) -> Cr1 {
        Cr1::from_bits(self.read(Reg::Cr1) as u16)
    }

    /// Read-modify-write CR1.
    fn update_cr1(&mut self, f: impl FnOnce(Cr1) -> Cr1) {
        let cr1 = self.cr1();
        self.write(Reg::Cr1, f(cr1).into_bits() as u32);
    }

    /// Read-modify-write CR2.
    fn update_cr2(&mut self, f: impl FnOnce(Cr2) -> Cr2) {
        let cr2 = Cr2::from_bits(self.read(Reg::Cr2) as u16);
        self.write(Reg::Cr2, f(cr2).into_bits() as u32);
    }

    fn sr1(&mut self) -> Sr1 {
        Sr1::from_bits(self.read(Reg::Sr1) as u16)
    }

    fn write_sr1(&mut self, sr1: Sr1) {
        self.write(Reg::Sr1, sr1.into_bits() as u32);
    }

    /// Reading SR2 right after SR1 clears ADDR.
    fn sr2(&mut self) -> Sr2 {
        Sr2::from_bits(self.read(Reg::Sr2) as u16)
    }

    fn write_data(&mut self, byte: u8) {
        self.write(Reg::Dr, byte as u32);
    }

    fn read_data(&mut self) -> u8 {
        self.read(Reg::Dr) as u8
    }
}

impl<R: RegisterAccess + ?Sized> TypedAccess for R {}
