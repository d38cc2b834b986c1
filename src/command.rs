//! Command bytes of the Bus Pirate binary bit-bang and I2C modes.

use bit_field::BitField;

use crate::Error;

/// Largest payload accepted by a single bulk write command.
pub const MAX_BULK_WRITE: usize = 16;

/// Reply to the bit-bang mode entry command.
pub const BBIO_REPLY: &[u8] = b"BBIO1";

/// Reply to the I2C mode entry command.
pub const I2C_REPLY: &[u8] = b"I2C1";

/// Single-byte acknowledgement for most commands.
pub const ACK: &[u8] = &[0x01];

/// Per-byte acknowledgement sent back by the adapter during a bulk write.
pub(crate) const BULK_BYTE_ACK: u8 = 0x00;

/// I2C bus speed selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum I2cSpeed {
    Khz5,
    #[default]
    Khz50,
    Khz100,
    Khz400,
}

impl I2cSpeed {
    fn selector(self) -> u8 {
        match self {
            I2cSpeed::Khz5 => 0,
            I2cSpeed::Khz50 => 1,
            I2cSpeed::Khz100 => 2,
            I2cSpeed::Khz400 => 3,
        }
    }

    pub fn hertz(self) -> u32 {
        match self {
            I2cSpeed::Khz5 => 5_000,
            I2cSpeed::Khz50 => 50_000,
            I2cSpeed::Khz100 => 100_000,
            I2cSpeed::Khz400 => 400_000,
        }
    }
}

impl std::str::FromStr for I2cSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase();
        Ok(match normalised.trim_end_matches("hz") {
            "5k" | "5000" => Self::Khz5,
            "50k" | "50000" => Self::Khz50,
            "100k" | "100000" => Self::Khz100,
            "400k" | "400000" => Self::Khz400,
            _ => return Err(format!("unsupported I2C speed {s:?} (use 5k, 50k, 100k or 400k)")),
        })
    }
}

impl std::fmt::Display for I2cSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}kHz", self.hertz() / 1000)
    }
}

/// Power supply, pull-up, AUX and CS pin states for the peripheral command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bon::Builder)]
pub struct Peripherals {
    #[builder(default)]
    pub power: bool,
    #[builder(default)]
    pub pullups: bool,
    #[builder(default)]
    pub aux: bool,
    #[builder(default)]
    pub chip_select: bool,
}

/// Commands understood by the adapter in bit-bang or I2C mode.
///
/// Several commands share a byte value; their meaning depends on the mode
/// the adapter is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Enter (or return to) raw bit-bang mode.
    BitBang,
    /// From bit-bang mode: reset the adapter to its user terminal.
    ResetTerminal,
    /// From bit-bang mode: switch to the I2C bridge.
    EnterI2c,
    StartBit,
    StopBit,
    ReadByte,
    AckBit,
    NackBit,
    /// Header of a bulk write of `n` bytes, `1..=16`.
    BulkWrite(u8),
    ConfigurePeripherals(Peripherals),
    SetSpeed(I2cSpeed),
}

impl Command {
    /// Build a bulk write header, rejecting lengths the adapter cannot encode.
    pub fn bulk_write(len: usize) -> Result<Self, Error> {
        match u8::try_from(len) {
            Ok(n @ 1..=16) => Ok(Command::BulkWrite(n)),
            _ => Err(Error::BulkWriteLength(len)),
        }
    }

    /// The wire byte for this command.
    pub fn encode(self) -> u8 {
        match self {
            Command::BitBang => 0x00,
            Command::ResetTerminal => 0x0F,
            Command::EnterI2c => 0x02,
            Command::StartBit => 0x02,
            Command::StopBit => 0x03,
            Command::ReadByte => 0x04,
            Command::AckBit => 0x06,
            Command::NackBit => 0x07,
            Command::BulkWrite(n) => {
                let mut byte = 0x10u8;
                byte.set_bits(0..4, n.wrapping_sub(1) & 0x0F);
                byte
            }
            Command::ConfigurePeripherals(p) => {
                let mut byte = 0x40u8;
                byte.set_bit(3, p.power);
                byte.set_bit(2, p.pullups);
                byte.set_bit(1, p.aux);
                byte.set_bit(0, p.chip_select);
                byte
            }
            Command::SetSpeed(speed) => {
                let mut byte = 0x60u8;
                byte.set_bits(0..2, speed.selector());
                byte
            }
        }
    }

    /// The reply the adapter sends once the command has been accepted.
    ///
    /// `ReadByte` answers with the data byte itself and has no fixed reply.
    pub fn expected_reply(self) -> Option<&'static [u8]> {
        match self {
            Command::BitBang => Some(BBIO_REPLY),
            Command::EnterI2c => Some(I2C_REPLY),
            Command::ReadByte => None,
            _ => Some(ACK),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::BulkWrite(n) => write!(f, "bulk write of {n} bytes (0x{:02X})", self.encode()),
            Command::SetSpeed(speed) => write!(f, "set speed {speed} (0x{:02X})", self.encode()),
            other => write!(f, "{other:?} (0x{:02X})", other.encode()),
        }
    }
}
