//! A scripted Bus Pirate with a 24Cxx EEPROM attached to its I2C bus.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;

use buspirate_eeprom::Transport;

/// Bus activity as seen by the simulated adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BitBang,
    EnterI2c,
    ResetTerminal,
    Start,
    Stop,
    /// Completed bulk write with its payload.
    Write(Vec<u8>),
    Read,
    Ack,
    Nack,
    Speed(u8),
    Peripherals(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Terminal,
    BitBang,
    I2c,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Addressed {
    None,
    Write,
    Read,
}

/// Failure injection knobs.
#[derive(Debug, Clone, Default)]
pub struct Behaviour {
    /// Never answer the bit-bang handshake.
    pub silent: bool,
    /// Answer the I2C mode request with something other than `I2C1`.
    pub no_i2c: bool,
    /// NACK the device's write address.
    pub nak_write_address: bool,
    /// NACK the device's read address.
    pub nak_read_address: bool,
    /// NACK offset bytes after an acknowledged write address.
    pub nak_offset: bool,
    /// Reset without acknowledging the reset command.
    pub silent_reset: bool,
    /// Stop answering read requests (end of data) after this many bytes.
    pub end_of_data_after: Option<usize>,
    /// Time out every read after this many bytes.
    pub stall_after: Option<usize>,
}

struct State {
    behaviour: Behaviour,
    mode: Mode,
    memory: Vec<u8>,
    device: u8,
    offset_width: usize,
    pointer: usize,
    offset_bytes: Vec<u8>,
    addressed: Addressed,
    after_start: bool,
    bulk: Option<(usize, Vec<u8>)>,
    bytes_served: usize,
    stalled: bool,
    replies: VecDeque<u8>,
    events: Vec<Event>,
}

#[derive(Clone)]
pub struct SimulatedAdapter(Rc<RefCell<State>>);

impl SimulatedAdapter {
    /// `device` is the 8-bit write address of the EEPROM holding `memory`.
    pub fn new(device: u8, memory: Vec<u8>, offset_width: usize) -> Self {
        Self::with_behaviour(device, memory, offset_width, Behaviour::default())
    }

    pub fn with_behaviour(
        device: u8,
        memory: Vec<u8>,
        offset_width: usize,
        behaviour: Behaviour,
    ) -> Self {
        Self(Rc::new(RefCell::new(State {
            behaviour,
            mode: Mode::Terminal,
            memory,
            device,
            offset_width,
            pointer: 0,
            offset_bytes: Vec::new(),
            addressed: Addressed::None,
            after_start: false,
            bulk: None,
            bytes_served: 0,
            stalled: false,
            replies: VecDeque::new(),
            events: Vec::new(),
        })))
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    /// Bus events after the adapter entered I2C mode.
    pub fn i2c_events(&self) -> Vec<Event> {
        let events = self.events();
        let from = events
            .iter()
            .position(|e| *e == Event::EnterI2c)
            .map_or(events.len(), |p| p + 1);
        events[from..].to_vec()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.0.borrow().events.iter().filter(|e| *e == event).count()
    }

    pub fn resets(&self) -> usize {
        self.count(&Event::ResetTerminal)
    }
}

impl State {
    fn reply(&mut self, bytes: &[u8]) {
        self.replies.extend(bytes.iter().copied());
    }

    fn handle(&mut self, byte: u8) {
        if let Some((remaining, mut payload)) = self.bulk.take() {
            payload.push(byte);
            let ack = self.bus_write(byte);
            self.reply(&[if ack { 0x00 } else { 0x01 }]);
            if remaining > 1 {
                self.bulk = Some((remaining - 1, payload));
            } else {
                self.events.push(Event::Write(payload));
            }
            return;
        }

        match (self.mode, byte) {
            (_, 0x00) => {
                self.events.push(Event::BitBang);
                if !self.behaviour.silent {
                    self.mode = Mode::BitBang;
                    self.addressed = Addressed::None;
                    self.reply(b"BBIO1");
                }
            }
            (Mode::Terminal, _) => {}
            (Mode::BitBang, 0x0F) => {
                self.events.push(Event::ResetTerminal);
                self.mode = Mode::Terminal;
                if !self.behaviour.silent_reset {
                    self.reply(&[0x01]);
                }
            }
            (Mode::BitBang, 0x02) => {
                self.events.push(Event::EnterI2c);
                if self.behaviour.no_i2c {
                    self.reply(b"SPI1");
                } else {
                    self.mode = Mode::I2c;
                    self.reply(b"I2C1");
                }
            }
            (Mode::BitBang, _) => {}
            (Mode::I2c, 0x02) => {
                self.events.push(Event::Start);
                self.after_start = true;
                self.addressed = Addressed::None;
                self.reply(&[0x01]);
            }
            (Mode::I2c, 0x03) => {
                self.events.push(Event::Stop);
                self.addressed = Addressed::None;
                self.reply(&[0x01]);
            }
            (Mode::I2c, 0x04) => self.bus_read(),
            (Mode::I2c, 0x06) => {
                self.events.push(Event::Ack);
                self.reply(&[0x01]);
            }
            (Mode::I2c, 0x07) => {
                self.events.push(Event::Nack);
                self.reply(&[0x01]);
            }
            (Mode::I2c, 0x10..=0x1F) => {
                self.bulk = Some(((byte & 0x0F) as usize + 1, Vec::new()));
                self.reply(&[0x01]);
            }
            (Mode::I2c, 0x40..=0x4F) => {
                self.events.push(Event::Peripherals(byte));
                self.reply(&[0x01]);
            }
            (Mode::I2c, 0x60..=0x63) => {
                self.events.push(Event::Speed(byte));
                self.reply(&[0x01]);
            }
            (Mode::I2c, _) => {}
        }
    }

    /// A byte clocked out on the bus; returns whether the EEPROM ACKs it.
    fn bus_write(&mut self, byte: u8) -> bool {
        if self.after_start {
            self.after_start = false;
            if byte == self.device && !self.behaviour.nak_write_address {
                self.addressed = Addressed::Write;
                self.offset_bytes.clear();
                return true;
            }
            if byte == self.device.wrapping_add(1) && !self.behaviour.nak_read_address {
                self.addressed = Addressed::Read;
                return true;
            }
            self.addressed = Addressed::None;
            return false;
        }
        match self.addressed {
            Addressed::Write => {
                if self.offset_bytes.len() < self.offset_width {
                    if self.behaviour.nak_offset {
                        return false;
                    }
                    self.offset_bytes.push(byte);
                    if self.offset_bytes.len() == self.offset_width {
                        self.pointer = self
                            .offset_bytes
                            .iter()
                            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
                    }
                } else if !self.memory.is_empty() {
                    let index = self.pointer % self.memory.len();
                    self.memory[index] = byte;
                    self.pointer += 1;
                }
                true
            }
            Addressed::Read | Addressed::None => false,
        }
    }

    fn bus_read(&mut self) {
        self.events.push(Event::Read);
        if self.behaviour.stall_after == Some(self.bytes_served) {
            self.stalled = true;
        }
        if self.stalled || self.behaviour.end_of_data_after == Some(self.bytes_served) {
            return;
        }
        let byte = match self.addressed {
            Addressed::Read if !self.memory.is_empty() => {
                let byte = self.memory[self.pointer % self.memory.len()];
                self.pointer += 1;
                byte
            }
            _ => 0xFF,
        };
        self.bytes_served += 1;
        self.reply(&[byte]);
    }
}

impl Read for SimulatedAdapter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        if state.stalled {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "simulated stall"));
        }
        if state.replies.is_empty() && state.behaviour.silent {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no reply"));
        }
        let mut n = 0;
        while n < buf.len() {
            match state.replies.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for SimulatedAdapter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        for &byte in buf {
            state.handle(byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for SimulatedAdapter {}

/// `0x00, 0x01, ...` wrapping at 256.
pub fn counting(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}
