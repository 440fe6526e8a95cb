#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

/*! # STM32F1 I2C master
 *
 * Polling driver for the I2C peripheral of the STM32F1 family.
 *
 * [`I2cMasterBuilder`] validates the requested bus timing, brings up clocks,
 * pins and timing registers, and hands back an [`I2cMaster`] (or
 * [`I2cMasterAsync`]) owning the register block. Register oriented transfers
 * are available through [`I2cMaster::write_register`] and
 * [`I2cMaster::read_registers`]; arbitrary transfers through the
 * [`embedded_hal::i2c::I2c`] implementation.
 *
 * Every wait on a status flag is bounded by the retry budget given to the
 * builder, so a silent or stuck slave surfaces as [`Error::Timeout`].
 */

pub use embedded_i2c_regs::{Instance, RegisterAccess};
mod bus;
mod error;
mod hal;
mod hal_async;
mod master;
mod master_async;
#[cfg(feature = "stm32f103")]
mod mmio;
mod timing;
mod traits;

pub use error::{ArgumentError, ConfigError, Error, Event};
pub use master::{I2cMaster, I2cMasterBuilder};
pub use master_async::I2cMasterAsync;
#[cfg(feature = "stm32f103")]
pub use mmio::Stm32f1Registers;
pub use timing::{
    FAST_HIGH_PERIOD_NS, FAST_MAX_RISE_NS, NS_PER_US, STANDARD_HIGH_PERIOD_NS,
    STANDARD_MAX_RISE_NS, Speed, Timing,
};

/// Results of I2C master operations.
pub type I2cResult<T> = Result<T, Error>;

/// Settle time after enabling the peripheral clocks, in milliseconds.
pub const CLOCK_SETTLE_MS: u32 = 5;

/// Default number of status polls after the first before a wait times out.
pub const DEFAULT_RETRIES: u32 = 10_000;

/// Default delay between two status polls, in nanoseconds.
pub const DEFAULT_POLL_INTERVAL_NS: u32 = 1_000;
