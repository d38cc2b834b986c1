//! Catalogue of 24Cxx serial EEPROMs.

/// A 24Cxx part; the number is the capacity in kilobits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip {
    C24C01,
    C24C02,
    C24C04,
    C24C08,
    C24C16,
    C24C32,
    C24C64,
    C24C128,
    C24C256,
    C24C512,
}

impl Chip {
    pub const ALL: [Chip; 10] = [
        Chip::C24C01,
        Chip::C24C02,
        Chip::C24C04,
        Chip::C24C08,
        Chip::C24C16,
        Chip::C24C32,
        Chip::C24C64,
        Chip::C24C128,
        Chip::C24C256,
        Chip::C24C512,
    ];

    pub fn kilobits(self) -> u32 {
        match self {
            Chip::C24C01 => 1,
            Chip::C24C02 => 2,
            Chip::C24C04 => 4,
            Chip::C24C08 => 8,
            Chip::C24C16 => 16,
            Chip::C24C32 => 32,
            Chip::C24C64 => 64,
            Chip::C24C128 => 128,
            Chip::C24C256 => 256,
            Chip::C24C512 => 512,
        }
    }

    pub fn size_bytes(self) -> usize {
        crate::kilobits_to_bytes(self.kilobits())
    }
}

impl std::fmt::Display for Chip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "24C{:02}", self.kilobits())
    }
}

impl std::str::FromStr for Chip {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let digits = upper
            .strip_prefix("C24C")
            .or_else(|| upper.strip_prefix("24C"))
            .ok_or_else(|| format!("unknown chip {s:?} (expected e.g. 24C02)"))?;
        let kilobits: u32 = digits
            .parse()
            .map_err(|_| format!("unknown chip {s:?} (expected e.g. 24C02)"))?;
        Chip::ALL
            .into_iter()
            .find(|chip| chip.kilobits() == kilobits)
            .ok_or_else(|| format!("unsupported chip {s:?}"))
    }
}
