//! Memory map and bit constants for the STM32F103 I2C bring-up.

/// Base address of the I2C1 register block.
pub const I2C1_BASE: usize = 0x4000_5400;

/// Base address of the I2C2 register block.
pub const I2C2_BASE: usize = 0x4000_5800;

/// Base address of the reset and clock control (RCC) register block.
pub const RCC_BASE: usize = 0x4002_1000;

/// Base address of the GPIOB register block.
pub const GPIOB_BASE: usize = 0x4001_0c00;

/// APB1ENR bit gating the I2C1 clock.
pub const RCC_APB1ENR_I2C1EN: u32 = 1 << 21;

/// APB1ENR bit gating the I2C2 clock.
pub const RCC_APB1ENR_I2C2EN: u32 = 1 << 22;

/// APB2ENR bit gating the GPIOB clock.
pub const RCC_APB2ENR_IOPBEN: u32 = 1 << 3;

/// Pin configuration nibble for an alternate function, open-drain output
/// at 50 MHz (CNF = 0b11, MODE = 0b11).
///
/// I2C is a wired-AND bus: the pins must only ever pull low or release,
/// never drive high.
pub const PIN_AF_OPEN_DRAIN_50MHZ: u32 = 0b1111;

/// Width in bits of one pin configuration field in GPIOx_CRL/CRH.
pub const PIN_CONFIG_BITS: u32 = 4;

/// Smallest peripheral input clock accepted in CR2.FREQ, in MHz.
pub const MIN_INPUT_CLOCK_MHZ: u8 = 2;

/// Largest peripheral input clock accepted in CR2.FREQ, in MHz (APB1 maximum).
pub const MAX_INPUT_CLOCK_MHZ: u8 = 36;

/// Largest value representable in CCR.CCR (12 bits).
pub const CCR_MAX: u32 = 0x0fff;

/// Largest value representable in TRISE.TRISE (6 bits).
pub const TRISE_MAX: u32 = 0x3f;
