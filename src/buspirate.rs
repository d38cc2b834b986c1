use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::time::Duration;

use log::{debug, info, warn};
use serialport::{ClearBuffer, SerialPort};

use crate::command::{Command, I2cSpeed, Peripherals, BBIO_REPLY, BULK_BYTE_ACK};
use crate::modes::{ActiveMode, BitBang, I2c, Modes};
use crate::Error;

/// Number of `0x00` bytes sent before giving up on the bit-bang handshake.
pub const HANDSHAKE_ATTEMPTS: usize = 20;

/// Byte channel to the adapter.
///
/// Implemented for serial ports opened by [`open`]; anything else that can
/// stand in for the adapter (a simulator, a socket) only needs `Read + Write`.
pub trait Transport: Read + Write {
    /// Drop any bytes already received but not yet read.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

#[derive(Debug, Clone, bon::Builder)]
pub struct SerialOptions {
    #[builder(default = 115_200)]
    pub baud_rate: u32,
    /// Read timeout for every reply from the adapter.
    #[builder(default = Duration::from_millis(200))]
    pub timeout: Duration,
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Owns the transport and returns the adapter to its user terminal when
/// dropped.
struct Link<P: Transport> {
    port: P,
    mode: Modes,
}

impl<P: Transport> Link<P> {
    fn send(&mut self, command: Command) -> Result<(), Error> {
        debug!("-> {command}");
        self.port.write_all(&[command.encode()])?;
        self.port.flush()?;
        Ok(())
    }

    /// Send `command` and check the adapter's fixed reply to it.
    fn send_expect(&mut self, command: Command) -> Result<(), Error> {
        self.send(command)?;
        if let Some(expected) = command.expected_reply() {
            let received = self.receive(command, expected.len())?;
            if received != expected {
                return Err(Error::UnexpectedResponse {
                    command,
                    expected,
                    received,
                });
            }
        }
        Ok(())
    }

    /// Read up to `len` reply bytes for `command`.
    ///
    /// Returns fewer bytes only if the transport reports end of data.
    fn receive(&mut self, command: Command, len: usize) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(Error::Timeout { command })
                }
                Err(e) => return Err(e.into()),
            }
        }
        buf.truncate(filled);
        debug!("<- {buf:02X?}");
        Ok(buf)
    }

    fn handshake(&mut self) -> Result<(), Error> {
        for attempt in 1..=HANDSHAKE_ATTEMPTS {
            self.send(Command::BitBang)?;
            match self.receive(Command::BitBang, BBIO_REPLY.len()) {
                Ok(reply) if reply == BBIO_REPLY => {
                    debug!("bit-bang mode after {attempt} attempt(s)");
                    // Earlier attempts may have queued extra replies.
                    self.port.discard_input()?;
                    self.mode = Modes::BitBang;
                    return Ok(());
                }
                Ok(_) | Err(Error::Timeout { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::Handshake {
            attempts: HANDSHAKE_ATTEMPTS,
        })
    }

    /// Leave whatever binary mode is active and reset to the user terminal.
    ///
    /// The reset command is written at most once per connection, and only
    /// once the adapter has confirmed it is back in bit-bang mode: in I2C
    /// mode the same byte starts the bus sniffer.
    fn release(&mut self) -> Result<(), Error> {
        let result = match self.mode {
            Modes::Terminal => return Ok(()),
            Modes::BitBang => self.send_expect(Command::ResetTerminal),
            Modes::I2c => self
                .send_expect(Command::BitBang)
                .and_then(|()| self.send_expect(Command::ResetTerminal)),
        };
        self.mode = Modes::Terminal;
        if result.is_ok() {
            info!("adapter reset to user terminal");
        }
        result
    }
}

impl<P: Transport> Drop for Link<P> {
    fn drop(&mut self) {
        let mode = self.mode;
        if let Err(e) = self.release() {
            warn!("failed to release adapter from {} mode: {e}", mode.name());
        }
    }
}

/// Bus Pirate connection in mode `M` over transport `P`.
pub struct BusPirate<M: ActiveMode, P: Transport = Box<dyn SerialPort>> {
    _mode: PhantomData<M>,
    link: Link<P>,
}

/// Consume $this and return it with the new mode type.
macro_rules! with_mode {
    ($this:ident, $mode:ty) => {{
        let BusPirate { _mode, link } = $this;
        BusPirate::<$mode, _> {
            _mode: PhantomData,
            link,
        }
    }};
}

/// Open the serial device at `path` and put the adapter into bit-bang mode.
pub fn open(path: &str, options: &SerialOptions) -> Result<BusPirate<BitBang>, Error> {
    let serial_port = serialport::new(path, options.baud_rate)
        .timeout(options.timeout)
        .open()
        .map_err(|source| Error::Open {
            port: path.to_owned(),
            source,
        })?;
    info!("opened {path} at {} baud", options.baud_rate);
    BusPirate::connect(serial_port)
}

impl<P: Transport> BusPirate<BitBang, P> {
    /// Perform the bit-bang handshake over an already open transport.
    pub fn connect(port: P) -> Result<Self, Error> {
        let mut link = Link {
            port,
            mode: Modes::Terminal,
        };
        link.handshake()?;
        info!("adapter in bit-bang mode");
        Ok(BusPirate {
            _mode: PhantomData,
            link,
        })
    }

    /// Put the Bus Pirate into I2C mode at `speed`, optionally switching
    /// power and pull-ups.
    pub fn enter_i2c_mode(
        mut self,
        speed: I2cSpeed,
        peripherals: Option<Peripherals>,
    ) -> Result<BusPirate<I2c, P>, Error> {
        self.switch_to_i2c(speed, peripherals)?;
        Ok(with_mode!(self, I2c))
    }

    fn switch_to_i2c(
        &mut self,
        speed: I2cSpeed,
        peripherals: Option<Peripherals>,
    ) -> Result<(), Error> {
        self.link.send_expect(Command::EnterI2c)?;
        self.link.mode = Modes::I2c;
        self.link.send_expect(Command::SetSpeed(speed))?;
        if let Some(peripherals) = peripherals {
            self.link
                .send_expect(Command::ConfigurePeripherals(peripherals))?;
        }
        info!("adapter in I2C mode at {speed}");
        Ok(())
    }
}

impl<M: ActiveMode, P: Transport> BusPirate<M, P> {
    /// Return the adapter to its user terminal and close the connection.
    pub fn close(mut self) -> Result<(), Error> {
        self.link.release()
    }
}

impl<P: Transport> BusPirate<I2c, P> {
    /// Emit a start (or repeated start) condition.
    pub fn start(&mut self) -> Result<(), Error> {
        self.link.send_expect(Command::StartBit)
    }

    pub fn stop(&mut self) -> Result<(), Error> {
        self.link.send_expect(Command::StopBit)
    }

    /// Write up to 16 bytes to the bus.
    ///
    /// Every byte is sent even after a NACK so the adapter stays in step;
    /// returns the index of the first byte the target did not acknowledge.
    pub fn write_bulk(&mut self, bytes: &[u8]) -> Result<Option<usize>, Error> {
        let command = Command::bulk_write(bytes.len())?;
        self.link.send_expect(command)?;

        let mut first_nack = None;
        for (index, &byte) in bytes.iter().enumerate() {
            self.link.port.write_all(&[byte])?;
            self.link.port.flush()?;
            let reply = self.link.receive(command, 1)?;
            match reply.first() {
                Some(&BULK_BYTE_ACK) => {}
                Some(_) => {
                    first_nack.get_or_insert(index);
                }
                None => {
                    return Err(Error::UnexpectedResponse {
                        command,
                        expected: &[BULK_BYTE_ACK],
                        received: reply,
                    })
                }
            }
        }
        Ok(first_nack)
    }

    /// Clock one byte in from the target.
    ///
    /// `None` means the adapter signalled end of data instead of replying.
    pub fn read_byte(&mut self) -> Result<Option<u8>, Error> {
        self.link.send(Command::ReadByte)?;
        let reply = self.link.receive(Command::ReadByte, 1)?;
        Ok(reply.first().copied())
    }

    /// Acknowledge the last byte read, asking the target for more.
    pub fn ack(&mut self) -> Result<(), Error> {
        self.link.send_expect(Command::AckBit)
    }

    /// Decline the last byte read, ending the target's transmission.
    pub fn nack(&mut self) -> Result<(), Error> {
        self.link.send_expect(Command::NackBit)
    }
}
