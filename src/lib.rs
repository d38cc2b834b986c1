//! Read 24Cxx I2C EEPROMs through a Bus Pirate in binary I2C mode.
//!
//! ```no_run
//! use buspirate_eeprom::{format_hex_dump, I2cSpeed, SerialOptions};
//!
//! let bp = buspirate_eeprom::open("/dev/ttyUSB0", &SerialOptions::default())?;
//! let mut bp = bp.enter_i2c_mode(I2cSpeed::Khz50, None)?;
//! let data = bp.dump_chip(0xA0, 2)?;
//! bp.close()?;
//! print!("{}", format_hex_dump(&data));
//! # Ok::<(), buspirate_eeprom::Error>(())
//! ```

mod buspirate;
pub mod chip;
pub mod command;
mod eh_i2c;
mod error;
pub mod hexdump;
pub mod modes;
mod reader;
mod transaction;

pub use buspirate::{open, BusPirate, SerialOptions, Transport, HANDSHAKE_ATTEMPTS};
pub use chip::Chip;
pub use command::{Command, I2cSpeed, Peripherals};
pub use error::{Error, ErrorKind, Phase};
pub use hexdump::{format_hex_dump, HexDump};
pub use reader::{dump, dump_with, kilobits_to_bytes, Dump, DumpRequest};
pub use transaction::{Offset, ReadTransaction, MAX_READ_LENGTH};
