//! CRC routines used on the 1-Wire bus.

/// Computes the Dallas/Maxim CRC-8 (`X^8 + X^5 + X^4 + 1`) of `data`.
///
/// Running the CRC over a sequence whose last byte is the CRC of the preceding
/// bytes yields zero.
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0, |crc, &byte| {
        let mut crc = crc ^ byte;
        for _ in 0..8 {
            if crc & 0x1 == 0x1 {
                crc = (crc >> 1) ^ 0x8c;
            } else {
                crc >>= 1;
            }
        }
        crc
    })
}

/// Computes the 1-Wire CRC-16 (`X^16 + X^15 + X^2 + 1`) of `data`, seeded with `seed`.
///
/// Devices transmit the inverted CRC, least significant byte first.
pub fn crc16(seed: u16, data: &[u8]) -> u16 {
    data.iter().fold(seed, |crc, &byte| {
        let mut crc = crc ^ byte as u16;
        for _ in 0..8 {
            if crc & 0x1 == 0x1 {
                crc = (crc >> 1) ^ 0xa001;
            } else {
                crc >>= 1;
            }
        }
        crc
    })
}
