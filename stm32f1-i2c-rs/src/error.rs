use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_i2c_regs::Sr1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// I2C master errors.
pub enum Error {
    /// A status flag was not raised within the retry budget.
    Timeout(Event),
    /// The slave did not acknowledge the address or a data byte.
    NotAcknowledged(NoAcknowledgeSource),
    /// Another master won arbitration of the bus.
    ArbitrationLost,
    /// The requested bus timing cannot be programmed.
    InvalidConfiguration(ConfigError),
    /// A transfer was requested with arguments the protocol cannot express.
    InvalidArgument(ArgumentError),
}

impl From<ConfigError> for Error {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfiguration(value)
    }
}

impl From<ArgumentError> for Error {
    fn from(value: ArgumentError) -> Self {
        Self::InvalidArgument(value)
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::NotAcknowledged(source) => ErrorKind::NoAcknowledge(*source),
            Error::ArbitrationLost => ErrorKind::ArbitrationLoss,
            _ => ErrorKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Bus timing configuration errors.
pub enum ConfigError {
    /// Input clock frequency (MHz) outside of what CR2.FREQ accepts.
    ClockOutOfRange(u8),
    /// The clock divider evaluates to zero for this input clock.
    ZeroDivider,
    /// The clock divider does not fit in CCR.
    ///
    /// Not produced for input clocks within 2..=36 MHz, where CCR is at most 2500.
    DividerOverflow(u32),
    /// The rise time does not fit in TRISE.
    ///
    /// Not produced for input clocks within 2..=36 MHz, where TRISE is at most 38.
    RiseTimeOverflow(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Transfer argument errors.
pub enum ArgumentError {
    /// Slave address does not fit in 7 bits.
    AddressOutOfRange(u8),
    /// Zero-length reads are not allowed.
    ZeroLength,
    /// Destination buffer is smaller than the requested byte count.
    BufferTooSmall {
        /// Number of bytes requested.
        requested: usize,
        /// Capacity of the buffer supplied.
        capacity: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Status events the master waits for.
pub enum Event {
    /// SB: start or repeated start generated.
    StartGenerated,
    /// ADDR: address sent and acknowledged.
    AddressAcknowledged,
    /// TXE: data register empty.
    TransmitEmpty,
    /// BTF: byte transfer finished.
    ByteTransferred,
    /// RXNE: data register holds a received byte.
    ReceiveNotEmpty,
}

impl Event {
    /// Whether the event has occurred according to a status register snapshot.
    pub fn is_set(self, sr1: Sr1) -> bool {
        match self {
            Event::StartGenerated => sr1.sb(),
            Event::AddressAcknowledged => sr1.addr(),
            Event::TransmitEmpty => sr1.txe(),
            Event::ByteTransferred => sr1.btf(),
            Event::ReceiveNotEmpty => sr1.rxne(),
        }
    }

    /// Which phase of the transfer an acknowledge failure during this event refers to.
    pub(crate) fn nack_source(self) -> NoAcknowledgeSource {
        match self {
            Event::AddressAcknowledged => NoAcknowledgeSource::Address,
            Event::TransmitEmpty | Event::ByteTransferred => NoAcknowledgeSource::Data,
            _ => NoAcknowledgeSource::Unknown,
        }
    }
}
