use crate::command::Command;

/// Which phase of a read transaction a device failed to acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Device address with the write bit clear.
    WriteAddress,
    /// Device address with the read bit set.
    ReadAddress,
    /// Offset or payload bytes following the write address.
    Data,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::WriteAddress => "write address",
            Phase::ReadAddress => "read address",
            Phase::Data => "data bytes",
        })
    }
}

/// Coarse classification of [`Error`], for callers deciding whether to
/// retry, abort or report a partial dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Protocol,
    Transaction,
    ShortRead,
    Timeout,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::Protocol => "ProtocolError",
            ErrorKind::Transaction => "TransactionError",
            ErrorKind::ShortRead => "ShortReadError",
            ErrorKind::Timeout => "TimeoutError",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("adapter did not enter bit-bang mode after {attempts} attempts")]
    Handshake { attempts: usize },

    #[error("serial link failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected reply to {command}: expected {expected:02X?}, received {received:02X?}")]
    UnexpectedResponse {
        command: Command,
        expected: &'static [u8],
        received: Vec<u8>,
    },

    #[error(
        "read address 0x{read_address:02X} must be write address 0x{write_address:02X} plus one"
    )]
    AddressMismatch { write_address: u8, read_address: u8 },

    #[error("a read transaction must request at least one byte")]
    EmptyRead,

    #[error("read of {length} bytes exceeds the largest supported part ({max} bytes)")]
    ReadTooLong { length: usize, max: usize },

    #[error("offset 0x{offset:X} does not fit in a {width}-byte device address")]
    OffsetRange { offset: u32, width: usize },

    #[error("bulk write of {0} bytes cannot be encoded (1 to 16 allowed)")]
    BulkWriteLength(usize),

    #[error("device 0x{address:02X} did not acknowledge the {phase}")]
    Nack { phase: Phase, address: u8 },

    #[error("short read: {} of {requested} bytes before end of data", .data.len())]
    ShortRead { requested: usize, data: Vec<u8> },

    #[error("timed out waiting for reply to {command}")]
    Timeout { command: Command },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Open { .. } | Error::Handshake { .. } | Error::Io(_) => ErrorKind::Connection,
            Error::UnexpectedResponse { .. }
            | Error::AddressMismatch { .. }
            | Error::EmptyRead
            | Error::ReadTooLong { .. }
            | Error::OffsetRange { .. }
            | Error::BulkWriteLength(_) => ErrorKind::Protocol,
            Error::Nack { .. } => ErrorKind::Transaction,
            Error::ShortRead { .. } => ErrorKind::ShortRead,
            Error::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Bytes collected before a short read, if any.
    pub fn partial_data(&self) -> Option<&[u8]> {
        match self {
            Error::ShortRead { data, .. } => Some(data),
            _ => None,
        }
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind as HalKind, NoAcknowledgeSource};

        match self {
            Error::Nack {
                phase: Phase::Data, ..
            } => HalKind::NoAcknowledge(NoAcknowledgeSource::Data),
            Error::Nack { .. } => HalKind::NoAcknowledge(NoAcknowledgeSource::Address),
            _ => HalKind::Other,
        }
    }
}
