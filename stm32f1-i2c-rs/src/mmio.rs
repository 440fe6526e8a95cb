use embedded_i2c_regs::{Reg, RegisterAccess};
use stm32f1::stm32f103 as pac;

/// Memory-mapped registers of an STM32F103 I2C instance, its RCC gates and GPIOB.
///
/// Consumes the PAC singletons of the I2C block and of GPIOB. RCC is shared
/// with the rest of the firmware, only the I2C and GPIOB enable bits are
/// modified through it.
pub struct Stm32f1Registers {
    i2c: &'static pac::i2c1::RegisterBlock,
    rcc: &'static pac::rcc::RegisterBlock,
    gpiob: &'static pac::gpioa::RegisterBlock,
}

impl Stm32f1Registers {
    /// Registers of I2C1 (PB6/PB7).
    pub fn i2c1(_i2c: pac::I2C1, _gpiob: pac::GPIOB) -> Self {
        // SAFETY: the I2C and GPIOB singletons are consumed here, so no other
        // owner can reach those blocks. RCC enable registers are only
        // read-modify-written.
        unsafe { Self::from_ptr(pac::I2C1::ptr()) }
    }

    /// Registers of I2C2 (PB10/PB11).
    pub fn i2c2(_i2c: pac::I2C2, _gpiob: pac::GPIOB) -> Self {
        // SAFETY: as above.
        unsafe { Self::from_ptr(pac::I2C2::ptr()) }
    }

    unsafe fn from_ptr(i2c: *const pac::i2c1::RegisterBlock) -> Self {
        unsafe {
            Self {
                i2c: &*i2c,
                rcc: &*pac::RCC::ptr(),
                gpiob: &*pac::GPIOB::ptr(),
            }
        }
    }
}

impl RegisterAccess for Stm32f1Registers {
    fn read(&mut self, reg: Reg) -> u32 {
        match reg {
            Reg::Cr1 => self.i2c.cr1.read().bits(),
            Reg::Cr2 => self.i2c.cr2.read().bits(),
            Reg::Oar1 => self.i2c.oar1.read().bits(),
            Reg::Oar2 => self.i2c.oar2.read().bits(),
            Reg::Dr => self.i2c.dr.read().bits(),
            Reg::Sr1 => self.i2c.sr1.read().bits(),
            Reg::Sr2 => self.i2c.sr2.read().bits(),
            Reg::Ccr => self.i2c.ccr.read().bits(),
            Reg::Trise => self.i2c.trise.read().bits(),
            Reg::Apb1enr => self.rcc.apb1enr.read().bits(),
            Reg::Apb2enr => self.rcc.apb2enr.read().bits(),
            Reg::Crl => self.gpiob.crl.read().bits(),
            Reg::Crh => self.gpiob.crh.read().bits(),
        }
    }

    fn write(&mut self, reg: Reg, value: u32) {
        match reg {
            Reg::Cr1 => self.i2c.cr1.write(|w| unsafe { w.bits(value) }),
            Reg::Cr2 => self.i2c.cr2.write(|w| unsafe { w.bits(value) }),
            Reg::Oar1 => self.i2c.oar1.write(|w| unsafe { w.bits(value) }),
            Reg::Oar2 => self.i2c.oar2.write(|w| unsafe { w.bits(value) }),
            Reg::Dr => self.i2c.dr.write(|w| unsafe { w.bits(value) }),
            Reg::Sr1 => self.i2c.sr1.write(|w| unsafe { w.bits(value) }),
            // read only
            Reg::Sr2 => {}
            Reg::Ccr => self.i2c.ccr.write(|w| unsafe { w.bits(value) }),
            Reg::Trise => self.i2c.trise.write(|w| unsafe { w.bits(value) }),
            Reg::Apb1enr => self.rcc.apb1enr.write(|w| unsafe { w.bits(value) }),
            Reg::Apb2enr => self.rcc.apb2enr.write(|w| unsafe { w.bits(value) }),
            Reg::Crl => self.gpiob.crl.write(|w| unsafe { w.bits(value) }),
            Reg::Crh => self.gpiob.crh.write(|w| unsafe { w.bits(value) }),
        }
    }
}
