use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::buspirate::{self, SerialOptions, Transport};
use crate::command::{I2cSpeed, Peripherals};
use crate::modes::{BitBang, I2c};
use crate::transaction::{Offset, ReadTransaction};
use crate::{BusPirate, Error, Phase};

/// Capacity in bytes of a part of `kilobits` capacity.
pub fn kilobits_to_bytes(kilobits: u32) -> usize {
    (kilobits as usize).saturating_mul(1024) / 8
}

impl<P: Transport> BusPirate<I2c, P> {
    /// Run one sequential read: start, write address and offset, repeated
    /// start, read address, `length` reads, stop.
    ///
    /// A stop condition is attempted on every failure after the first start.
    pub fn read_bytes(&mut self, transaction: &ReadTransaction) -> Result<Vec<u8>, Error> {
        self.start()?;
        match self.read_after_start(transaction) {
            Ok(data) => {
                self.stop()?;
                Ok(data)
            }
            Err(e) => {
                if let Err(stop_err) = self.stop() {
                    warn!("stop after failed read not accepted: {stop_err}");
                }
                Err(e)
            }
        }
    }

    fn read_after_start(&mut self, transaction: &ReadTransaction) -> Result<Vec<u8>, Error> {
        if let Some(index) = self.write_bulk(&transaction.address_frame())? {
            let phase = if index == 0 {
                Phase::WriteAddress
            } else {
                Phase::Data
            };
            return Err(Error::Nack {
                phase,
                address: transaction.write_address(),
            });
        }

        self.start()?;
        if self.write_bulk(&[transaction.read_address()])?.is_some() {
            return Err(Error::Nack {
                phase: Phase::ReadAddress,
                address: transaction.read_address(),
            });
        }

        let requested = transaction.length();
        let mut data = Vec::with_capacity(requested);
        while data.len() < requested {
            let Some(byte) = self.read_byte()? else {
                return Err(Error::ShortRead { requested, data });
            };
            data.push(byte);
            if data.len() < requested {
                self.ack()?;
            } else {
                self.nack()?;
            }
        }
        debug!("read {requested} bytes from 0x{:02X}", transaction.read_address());
        Ok(data)
    }

    /// Read a whole 24Cxx part of `chip_size_kilobits` capacity from offset 0.
    pub fn dump_chip(
        &mut self,
        write_address: u8,
        chip_size_kilobits: u32,
    ) -> Result<Vec<u8>, Error> {
        let transaction =
            ReadTransaction::for_device(write_address, kilobits_to_bytes(chip_size_kilobits))?
                .with_offset(Offset::for_kilobits(chip_size_kilobits, 0)?);
        self.read_bytes(&transaction)
    }
}

/// Everything needed to take a connected adapter through one dump.
#[derive(Debug, Clone, bon::Builder)]
pub struct DumpRequest {
    #[builder(default)]
    pub speed: I2cSpeed,
    pub peripherals: Option<Peripherals>,
    pub transaction: ReadTransaction,
}

/// Bytes read by [`dump`] and how long the transaction took.
#[derive(Debug, Clone)]
pub struct Dump {
    pub data: Vec<u8>,
    pub elapsed: Duration,
}

impl Dump {
    pub fn bytes_per_second(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.data.len() as f64 / seconds
        } else {
            f64::INFINITY
        }
    }
}

/// Open `port`, run `request` and return the adapter to its terminal.
pub fn dump(port: &str, serial: &SerialOptions, request: &DumpRequest) -> Result<Dump, Error> {
    dump_with(buspirate::open(port, serial)?, request)
}

/// Run `request` over an adapter already in bit-bang mode.
///
/// The adapter is released on every path. A failed release after a
/// complete read is logged and the data still returned.
pub fn dump_with<P: Transport>(
    bus_pirate: BusPirate<BitBang, P>,
    request: &DumpRequest,
) -> Result<Dump, Error> {
    let mut bus_pirate = bus_pirate.enter_i2c_mode(request.speed, request.peripherals)?;

    let started = Instant::now();
    let data = bus_pirate.read_bytes(&request.transaction)?;
    let elapsed = started.elapsed();

    if let Err(e) = bus_pirate.close() {
        warn!("dump complete but adapter not released cleanly: {e}");
    }
    Ok(Dump { data, elapsed })
}
