#![no_std]
#![deny(missing_docs)]
//! # embedded-i2c-regs
//! A no-std register map of the STM32F1 I2C master peripheral (the "v1" I2C block of RM0008).
//!
//! This crate provides typed views of the I2C control, status and timing registers,
//! together with the handful of RCC and GPIO registers needed to bring the peripheral up.
//! Drivers talk to the hardware exclusively through the [RegisterAccess] trait, which
//! lets the same driver code run against memory-mapped registers on the target or
//! against a simulated peripheral on the host.
//!
//! [Instance] describes the two I2C blocks of the STM32F103 and the pins they are
//! routed to.

mod access;
mod consts;
mod instance;
mod registers;

pub use access::{Block, Reg, RegisterAccess};
pub use consts::*;
pub use instance::{BusPins, Instance};
pub use registers::{Ccr, Cr1, Cr2, Sr1, Sr2, Trise};
