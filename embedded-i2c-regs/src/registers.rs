use bitfield_struct::bitfield;

/// # Control register 1 (I2C_CR1)
///
/// Starts and stops bus conditions, controls acknowledge generation and
/// enables or resets the peripheral. START and STOP are set by software and
/// cleared by hardware once the condition has been generated.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct Cr1 {
    /// Peripheral enable.
    pub pe: bool,
    /// SMBus mode (0 = I2C).
    pub smbus: bool,
    #[bits(1)]
    __r2: u8,
    /// SMBus type (0 = device, 1 = host).
    pub smbtype: bool,
    /// ARP enable.
    pub enarp: bool,
    /// PEC calculation enable.
    pub enpec: bool,
    /// General call enable.
    pub engc: bool,
    /// Clock stretching disable (slave mode only).
    pub nostretch: bool,
    /// Start generation. In master mode, setting this bit while the bus is
    /// already owned generates a repeated start.
    pub start: bool,
    /// Stop generation after the current byte transfer or after the current
    /// start condition is sent.
    pub stop: bool,
    /// Acknowledge enable. When set, an acknowledge is returned after each
    /// byte received.
    pub ack: bool,
    /// Acknowledge/PEC position (for data reception).
    pub pos: bool,
    /// Packet error checking transfer.
    pub pec: bool,
    /// SMBus alert.
    pub alert: bool,
    #[bits(1)]
    __r14: u8,
    /// Software reset. While set, the peripheral is held in reset.
    pub swrst: bool,
}

/// # Control register 2 (I2C_CR2)
///
/// FREQ must hold the APB1 clock frequency in MHz for the peripheral to
/// generate correct bus timings.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct Cr2 {
    /// Peripheral clock frequency in MHz (2 to 36 on STM32F1).
    #[bits(6)]
    pub freq: u8,
    #[bits(2)]
    __r6: u8,
    /// Error interrupt enable.
    pub iterren: bool,
    /// Event interrupt enable.
    pub itevten: bool,
    /// Buffer interrupt enable.
    pub itbufen: bool,
    /// DMA requests enable.
    pub dmaen: bool,
    /// DMA last transfer.
    pub last: bool,
    #[bits(3)]
    __r13: u8,
}

/// # Status register 1 (I2C_SR1)
///
/// Event and error flags. Error flags are cleared by writing 0 to them;
/// event flags are cleared by the register access sequences described on
/// each field.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct Sr1 {
    /// Start bit (master mode). Set when a start condition has been generated.
    /// Cleared by reading SR1 followed by writing DR.
    pub sb: bool,
    /// Address sent (master) / matched (slave). Cleared by reading SR1
    /// followed by reading SR2.
    pub addr: bool,
    /// Byte transfer finished.
    pub btf: bool,
    /// 10-bit header sent (master mode).
    pub add10: bool,
    /// Stop detection (slave mode).
    pub stopf: bool,
    #[bits(1)]
    __r5: u8,
    /// Data register not empty (receivers). Cleared by reading DR.
    pub rxne: bool,
    /// Data register empty (transmitters). Cleared by writing DR.
    pub txe: bool,
    /// Bus error: misplaced start or stop condition.
    pub berr: bool,
    /// Arbitration lost (master mode).
    pub arlo: bool,
    /// Acknowledge failure: no acknowledge returned by the receiver.
    pub af: bool,
    /// Overrun/underrun.
    pub ovr: bool,
    /// PEC error in reception.
    pub pecerr: bool,
    #[bits(1)]
    __r13: u8,
    /// Timeout or Tlow error.
    pub timeout: bool,
    /// SMBus alert.
    pub smbalert: bool,
}

impl Sr1 {
    /// True if any error flag is raised.
    pub const fn has_error(&self) -> bool {
        self.berr() || self.arlo() || self.af() || self.ovr() || self.pecerr() || self.timeout()
    }
}

/// # Status register 2 (I2C_SR2)
///
/// Reading SR2 after SR1 clears the ADDR flag; this read is a mandatory step
/// of every address phase, even when its value is of no interest.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct Sr2 {
    /// Master/slave. Set when the peripheral is in master mode.
    pub msl: bool,
    /// Bus busy.
    pub busy: bool,
    /// Transmitter/receiver (1 = data bytes transmitted).
    pub tra: bool,
    #[bits(1)]
    __r3: u8,
    /// General call address received (slave mode).
    pub gencall: bool,
    /// SMBus device default address (slave mode).
    pub smbdefault: bool,
    /// SMBus host header (slave mode).
    pub smbhost: bool,
    /// Dual flag (slave mode).
    pub dualf: bool,
    /// Packet error checking register.
    pub pec: u8,
}

/// # Clock control register (I2C_CCR)
///
/// Only writable while the peripheral is disabled (PE = 0).
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct Ccr {
    /// Clock control in master mode, in units of the peripheral clock period.
    #[bits(12)]
    pub ccr: u16,
    #[bits(2)]
    __r12: u8,
    /// Fast mode duty cycle (0 = Tlow/Thigh 2, 1 = Tlow/Thigh 16/9).
    pub duty: bool,
    /// Master mode selection (0 = standard, 1 = fast).
    pub fs: bool,
}

/// # Rise time register (I2C_TRISE)
///
/// Maximum SCL rise time in master mode, expressed in peripheral clock
/// periods plus one.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct Trise {
    /// Maximum rise time in master mode.
    #[bits(6)]
    pub trise: u8,
    #[bits(10)]
    __r6: u16,
}
