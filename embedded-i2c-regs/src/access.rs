use crate::{GPIOB_BASE, RCC_BASE};

/// Register block a [`Reg`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Block {
    /// The I2C peripheral selected by the driver.
    I2c,
    /// Reset and clock control.
    Rcc,
    /// GPIO port B, which carries the I2C pins.
    GpioB,
}

/// Registers touched by the I2C master driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    /// I2C control register 1.
    Cr1,
    /// I2C control register 2.
    Cr2,
    /// I2C own address register 1.
    Oar1,
    /// I2C own address register 2.
    Oar2,
    /// I2C data register.
    Dr,
    /// I2C status register 1.
    Sr1,
    /// I2C status register 2.
    Sr2,
    /// I2C clock control register.
    Ccr,
    /// I2C rise time register.
    Trise,
    /// RCC APB1 peripheral clock enable register.
    Apb1enr,
    /// RCC APB2 peripheral clock enable register.
    Apb2enr,
    /// GPIOB configuration register for pins 0 to 7.
    Crl,
    /// GPIOB configuration register for pins 8 to 15.
    Crh,
}

impl Reg {
    /// The block this register lives in.
    pub const fn block(self) -> Block {
        use Reg::*;
        match self {
            Cr1 | Cr2 | Oar1 | Oar2 | Dr | Sr1 | Sr2 | Ccr | Trise => Block::I2c,
            Apb1enr | Apb2enr => Block::Rcc,
            Crl | Crh => Block::GpioB,
        }
    }

    /// Byte offset of the register from the start of its block.
    pub const fn offset(self) -> usize {
        use Reg::*;
        match self {
            Cr1 => 0x00,
            Cr2 => 0x04,
            Oar1 => 0x08,
            Oar2 => 0x0c,
            Dr => 0x10,
            Sr1 => 0x14,
            Sr2 => 0x18,
            Ccr => 0x1c,
            Trise => 0x20,
            Apb2enr => 0x18,
            Apb1enr => 0x1c,
            Crl => 0x00,
            Crh => 0x04,
        }
    }

    /// Absolute address of the register, given the base of the I2C block in use.
    pub const fn address(self, i2c_base: usize) -> usize {
        let base = match self.block() {
            Block::I2c => i2c_base,
            Block::Rcc => RCC_BASE,
            Block::GpioB => GPIOB_BASE,
        };
        base + self.offset()
    }
}

/// Access to the peripheral registers.
///
/// This is the only path by which a driver touches the hardware. Implementations
/// are owned handles: memory-mapped registers on the target, or a simulated
/// peripheral on the host.
///
/// Reads take `&mut self` because several reads have side effects on the
/// peripheral (reading SR2 clears ADDR, reading DR clears RXNE).
pub trait RegisterAccess {
    /// Read the current value of a register.
    fn read(&mut self, reg: Reg) -> u32;

    /// Write a value to a register.
    fn write(&mut self, reg: Reg, value: u32);

    /// Read-modify-write a register.
    ///
    /// Only meant for control and configuration registers; a read of a status
    /// or data register may clear flags.
    fn modify<F: FnOnce(u32) -> u32>(&mut self, reg: Reg, f: F) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn read(&mut self, reg: Reg) -> u32 {
        T::read(self, reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        T::write(self, reg, value)
    }
}
