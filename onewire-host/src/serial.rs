use crate::{OneWireError, crc::crc8};
use core::{fmt, str::FromStr};

/// 64-bit registration number of a 1-Wire device.
///
/// | Byte | Description |
/// |------|-------------|
/// | 0 | Family code (e.g., 0x04 for DS1994) |
/// | 1-6 | Serial number |
/// | 7 | CRC-8 of bytes 0-6 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Serial(pub [u8; 8]);

impl Serial {
    /// Builds a serial number from a family code and six id bytes, appending a valid CRC.
    pub fn with_crc(family: u8, id: [u8; 6]) -> Self {
        let mut rom = [family, id[0], id[1], id[2], id[3], id[4], id[5], 0];
        rom[7] = crc8(&rom[..7]);
        Self(rom)
    }

    /// Family code of the device.
    #[inline]
    pub const fn family(&self) -> u8 {
        self.0[0]
    }

    /// Raw bytes, family code first.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Checks the trailing CRC byte.
    pub fn has_valid_crc(&self) -> bool {
        crc8(&self.0) == 0
    }

    /// Id bytes 1 to 6 in upper-case hex, stopping at the first zero byte.
    ///
    /// This is the number printed on the iButton can, without family code and CRC.
    pub fn show_serial(&self) -> String {
        self.0[1..7]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|b| format!("{b:02X}"))
            .collect()
    }
}

impl From<[u8; 8]> for Serial {
    fn from(value: [u8; 8]) -> Self {
        Self(value)
    }
}

impl From<u64> for Serial {
    /// Interprets a ROM code as produced by a bus search: family code in the low byte.
    fn from(value: u64) -> Self {
        Self(value.to_le_bytes())
    }
}

impl From<Serial> for u64 {
    fn from(value: Serial) -> Self {
        u64::from_le_bytes(value.0)
    }
}

impl TryFrom<&[u8]> for Serial {
    type Error = OneWireError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let rom: [u8; 8] = value.try_into().map_err(|_| {
            OneWireError::invalid(format!(
                "serial number must be 8 bytes, got {}",
                value.len()
            ))
        })?;
        Ok(Self(rom))
    }
}

impl FromStr for Serial {
    type Err = OneWireError;

    /// Parses 16 hex digits, family code first. Separators (`:`, `-`, space) are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | ' '))
            .collect();
        if digits.len() != 16 || !digits.is_ascii() {
            return Err(OneWireError::invalid(format!(
                "serial number must be 16 hex digits: '{s}'"
            )));
        }
        let mut rom = [0u8; 8];
        for (i, b) in rom.iter_mut().enumerate() {
            *b = u8::from_str_radix(&digits[2 * i..2 * i + 2], 16)
                .map_err(|e| OneWireError::invalid(format!("bad serial number '{s}': {e}")))?;
        }
        Ok(Self(rom))
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}
