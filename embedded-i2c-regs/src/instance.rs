use crate::{
    I2C1_BASE, I2C2_BASE, PIN_AF_OPEN_DRAIN_50MHZ, PIN_CONFIG_BITS, RCC_APB1ENR_I2C1EN,
    RCC_APB1ENR_I2C2EN, Reg,
};

/// I2C peripheral instance of the STM32F103.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Instance {
    /// I2C1, SCL on PB6 and SDA on PB7.
    #[default]
    I2c1,
    /// I2C2, SCL on PB10 and SDA on PB11.
    I2c2,
}

impl Instance {
    /// Base address of the instance's register block.
    pub const fn base(self) -> usize {
        match self {
            Instance::I2c1 => I2C1_BASE,
            Instance::I2c2 => I2C2_BASE,
        }
    }

    /// APB1ENR bit gating the instance's clock.
    pub const fn clock_enable(self) -> u32 {
        match self {
            Instance::I2c1 => RCC_APB1ENR_I2C1EN,
            Instance::I2c2 => RCC_APB1ENR_I2C2EN,
        }
    }

    /// Pins carrying the instance's bus lines.
    pub const fn pins(self) -> BusPins {
        match self {
            Instance::I2c1 => BusPins { config: Reg::Crl, scl: 6, sda: 7 },
            Instance::I2c2 => BusPins { config: Reg::Crh, scl: 10, sda: 11 },
        }
    }
}

/// Location of the SCL and SDA pins on GPIOB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusPins {
    /// Configuration register holding both pins ([`Reg::Crl`] or [`Reg::Crh`]).
    pub config: Reg,
    /// SCL pin number on port B.
    pub scl: u8,
    /// SDA pin number on port B.
    pub sda: u8,
}

impl BusPins {
    const fn shift(pin: u8) -> u32 {
        (pin as u32 % 8) * PIN_CONFIG_BITS
    }

    /// Mask covering the configuration fields of both pins.
    pub const fn mask(&self) -> u32 {
        (0xf << Self::shift(self.scl)) | (0xf << Self::shift(self.sda))
    }

    /// Field values placing both pins in alternate function open-drain mode.
    pub const fn open_drain(&self) -> u32 {
        (PIN_AF_OPEN_DRAIN_50MHZ << Self::shift(self.scl))
            | (PIN_AF_OPEN_DRAIN_50MHZ << Self::shift(self.sda))
    }

    /// Apply the open-drain configuration to a configuration register value,
    /// leaving the other pins untouched.
    pub const fn configure(&self, value: u32) -> u32 {
        (value & !self.mask()) | self.open_drain()
    }
}
