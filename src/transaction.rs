use crate::Error;

/// Capacity of the largest 24Cxx part, the 24C512.
pub const MAX_READ_LENGTH: usize = 64 * 1024;

/// Start address inside the EEPROM, sent after the write address.
///
/// Parts up to 16 kbit take a single offset byte; larger parts take two,
/// most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Byte(u8),
    Word(u16),
}

impl Default for Offset {
    fn default() -> Self {
        Offset::Byte(0)
    }
}

impl Offset {
    /// Offset of the width used by a part of `kilobits` capacity.
    ///
    /// Parts up to 16 kbit take one offset byte, larger parts two.
    pub fn for_kilobits(kilobits: u32, start: u32) -> Result<Self, Error> {
        Self::with_width(if kilobits > 16 { 2 } else { 1 }, start)
    }

    /// Offset `start` encoded in `width` (1 or 2) bytes.
    pub fn with_width(width: usize, start: u32) -> Result<Self, Error> {
        let out_of_range = || Error::OffsetRange {
            offset: start,
            width,
        };
        match width {
            1 => u8::try_from(start)
                .map(Offset::Byte)
                .map_err(|_| out_of_range()),
            2 => u16::try_from(start)
                .map(Offset::Word)
                .map_err(|_| out_of_range()),
            _ => Err(out_of_range()),
        }
    }

    pub fn bytes(self) -> Vec<u8> {
        match self {
            Offset::Byte(b) => vec![b],
            Offset::Word(w) => w.to_be_bytes().to_vec(),
        }
    }
}

/// One sequential read from a 24Cxx device.
///
/// Constructed only through [`ReadTransaction::new`] and
/// [`ReadTransaction::for_device`], so the address pair is always consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTransaction {
    write_address: u8,
    read_address: u8,
    offset: Offset,
    length: usize,
}

impl ReadTransaction {
    /// Validate a read of `length` bytes, starting at offset zero.
    pub fn new(write_address: u8, read_address: u8, length: usize) -> Result<Self, Error> {
        if write_address.checked_add(1) != Some(read_address) {
            return Err(Error::AddressMismatch {
                write_address,
                read_address,
            });
        }
        if length == 0 {
            return Err(Error::EmptyRead);
        }
        if length > MAX_READ_LENGTH {
            return Err(Error::ReadTooLong {
                length,
                max: MAX_READ_LENGTH,
            });
        }
        Ok(Self {
            write_address,
            read_address,
            offset: Offset::default(),
            length,
        })
    }

    /// Read from the device whose write address is `write_address`.
    pub fn for_device(write_address: u8, length: usize) -> Result<Self, Error> {
        Self::new(write_address, write_address.wrapping_add(1), length)
    }

    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }

    pub fn write_address(&self) -> u8 {
        self.write_address
    }

    pub fn read_address(&self) -> u8 {
        self.read_address
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Bytes of the first bulk write: write address followed by the offset.
    pub(crate) fn address_frame(&self) -> Vec<u8> {
        let mut frame = vec![self.write_address];
        frame.extend(self.offset.bytes());
        frame
    }
}
