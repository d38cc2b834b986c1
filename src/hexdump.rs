//! Fixed-width hex dump rendering.

use std::fmt;

pub const BYTES_PER_ROW: usize = 16;
const BYTES_PER_HALF_ROW: usize = BYTES_PER_ROW / 2;

/// Hex dump of a byte slice, 16 bytes per row:
///
/// ```text
/// 0000:  00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F  |................|
/// ```
///
/// A short final row is padded so its columns line up with full rows.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.0.chunks(BYTES_PER_ROW).enumerate() {
            write!(f, "{:04X}:  ", row * BYTES_PER_ROW)?;
            for half in chunk_halves(chunk) {
                for col in 0..BYTES_PER_HALF_ROW {
                    match half.get(col) {
                        Some(byte) => write!(f, "{byte:02X} ")?,
                        None => f.write_str("   ")?,
                    }
                }
                f.write_str(" ")?;
            }
            f.write_str("|")?;
            for col in 0..BYTES_PER_ROW {
                let c = chunk.get(col).map_or(' ', |&byte| printable(byte));
                write!(f, "{c}")?;
            }
            f.write_str("|\n")?;
        }
        Ok(())
    }
}

fn chunk_halves(chunk: &[u8]) -> [&[u8]; 2] {
    let split = chunk.len().min(BYTES_PER_HALF_ROW);
    let (first, second) = chunk.split_at(split);
    [first, second]
}

/// The character shown for `byte` in the ASCII column.
pub fn printable(byte: u8) -> char {
    if (32..=126).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

pub fn format_hex_dump(data: &[u8]) -> String {
    HexDump(data).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_has_no_rows() {
        assert_eq!(format_hex_dump(&[]), "");
    }

    #[test]
    fn first_row_of_counting_pattern() {
        let data: Vec<u8> = (0..0x80).collect();
        let dump = format_hex_dump(&data);
        assert_eq!(
            dump.lines().next().unwrap(),
            "0000:  00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F  |................|"
        );
        assert_eq!(dump.lines().count(), 8);
        assert_eq!(
            dump.lines().nth(4).unwrap(),
            "0040:  40 41 42 43 44 45 46 47  48 49 4A 4B 4C 4D 4E 4F  |@ABCDEFGHIJKLMNO|"
        );
    }

    #[test]
    fn short_row_is_padded() {
        let dump = format_hex_dump(b"Hello, EEPROM!\x00\xFFxyz");
        let rows: Vec<&str> = dump.lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            "0000:  48 65 6C 6C 6F 2C 20 45  45 50 52 4F 4D 21 00 FF  |Hello, EEPROM!..|"
        );
        assert_eq!(
            rows[1],
            "0010:  78 79 7A                                          |xyz             |"
        );
        assert_eq!(rows[0].len(), rows[1].len());
    }

    #[test]
    fn largest_part_keeps_four_digit_offsets() {
        let data = vec![0u8; crate::MAX_READ_LENGTH];
        let dump = format_hex_dump(&data);
        let rows: Vec<&str> = dump.lines().collect();
        assert_eq!(rows.len(), 4096);
        assert!(rows[4095].starts_with("FFF0:  "));
        assert!(rows.iter().all(|row| row.len() == rows[0].len()));
    }

    #[test]
    fn printable_range() {
        assert_eq!(printable(31), '.');
        assert_eq!(printable(b' '), ' ');
        assert_eq!(printable(b'~'), '~');
        assert_eq!(printable(127), '.');
        assert_eq!(printable(0xA0), '.');
    }
}
