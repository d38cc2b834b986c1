//! Dump a 24Cxx I2C EEPROM through a Bus Pirate as a hex dump.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use buspirate_eeprom::{
    dump, kilobits_to_bytes, Chip, DumpRequest, ErrorKind, HexDump, I2cSpeed, Offset,
    Peripherals, ReadTransaction, SerialOptions,
};
use clap::Parser;
use env_logger::Env;
use log::{error, info};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Dump(#[from] buspirate_eeprom::Error),
    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Parser)]
#[command(version, about = "Dump a 24Cxx I2C EEPROM through a Bus Pirate")]
struct Args {
    /// Serial device of the Bus Pirate.
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,

    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,

    /// Reply timeout in seconds.
    #[arg(short, long, default_value = "0.2", value_parser = parse_seconds)]
    timeout: Duration,

    /// 8-bit write address of the device, e.g. 0xA0.
    #[arg(short = 'a', long, value_parser = parse_byte)]
    write_address: u8,

    #[command(flatten)]
    size: Size,

    /// First byte to read inside the device.
    #[arg(long, default_value = "0", value_parser = parse_number)]
    offset: u32,

    /// Send the offset as two bytes (parts of 32 kbit and above).
    /// Implied by --chip and --chip-size-kilobits.
    #[arg(long)]
    wide_offset: bool,

    /// I2C bus speed: 5k, 50k, 100k or 400k.
    #[arg(short, long, default_value = "50k")]
    speed: I2cSpeed,

    /// Switch on the adapter's power supply.
    #[arg(long)]
    power: bool,

    /// Switch on the adapter's pull-up resistors.
    #[arg(long)]
    pullups: bool,

    /// Write the hex dump here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
#[group(required = true, multiple = false)]
struct Size {
    /// Number of bytes to read.
    #[arg(short, long)]
    length: Option<usize>,

    /// Read a whole part of this capacity.
    #[arg(short = 'k', long)]
    chip_size_kilobits: Option<u32>,

    /// Read a whole named part, e.g. 24C02.
    #[arg(short, long)]
    chip: Option<Chip>,
}

fn parse_number(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(hex, 16).map_err(|e| format!("invalid address byte {s:?}: {e}"))
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let seconds: f64 = s.parse().map_err(|e| format!("invalid timeout {s:?}: {e}"))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("timeout must be a positive number of seconds, got {s}"));
    }
    Ok(Duration::from_secs_f64(seconds))
}

impl Args {
    fn transaction(&self) -> Result<ReadTransaction, buspirate_eeprom::Error> {
        let kilobits = self
            .size
            .chip
            .map(Chip::kilobits)
            .or(self.size.chip_size_kilobits);
        let (length, offset) = match (kilobits, self.size.length) {
            (Some(kilobits), _) => (
                kilobits_to_bytes(kilobits),
                Offset::for_kilobits(kilobits, self.offset)?,
            ),
            (None, Some(length)) => {
                let width = if self.wide_offset { 2 } else { 1 };
                (length, Offset::with_width(width, self.offset)?)
            }
            // clap enforces one of the size arguments.
            (None, None) => unreachable!("no size argument"),
        };
        Ok(ReadTransaction::for_device(self.write_address, length)?.with_offset(offset))
    }

    fn peripherals(&self) -> Option<Peripherals> {
        (self.power || self.pullups).then(|| {
            Peripherals::builder()
                .power(self.power)
                .pullups(self.pullups)
                .build()
        })
    }

    fn write_dump(&self, data: &[u8]) -> Result<(), io::Error> {
        match &self.output {
            Some(path) => {
                let mut file = File::create(path)?;
                write!(file, "{}", HexDump(data))?;
                info!("wrote {} bytes to {}", data.len(), path.display());
            }
            None => write!(io::stdout().lock(), "{}", HexDump(data))?,
        }
        Ok(())
    }
}

fn bp_eeprom(args: &Args) -> Result<(), CliError> {
    let request = DumpRequest::builder()
        .speed(args.speed)
        .maybe_peripherals(args.peripherals())
        .transaction(args.transaction()?)
        .build();
    let serial = SerialOptions::builder()
        .baud_rate(args.baud)
        .timeout(args.timeout)
        .build();

    match dump(&args.port, &serial, &request) {
        Ok(dump) => {
            info!(
                "EEPROM grabbed, {:.3} seconds, {:.1} bytes / second",
                dump.elapsed.as_secs_f64(),
                dump.bytes_per_second()
            );
            args.write_dump(&dump.data)?;
            Ok(())
        }
        Err(e) => {
            if let Some(partial) = e.partial_data() {
                args.write_dump(partial)?;
            }
            Err(e.into())
        }
    }
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Connection => 2,
        ErrorKind::Protocol => 3,
        ErrorKind::Transaction => 4,
        ErrorKind::ShortRead => 5,
        ErrorKind::Timeout => 6,
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match bp_eeprom(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Dump(e)) => {
            error!("{}: {e}", e.kind().name());
            ExitCode::from(exit_code(e.kind()))
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
