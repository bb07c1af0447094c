//! 16-bit frame checksum.
//!
//! A reflected, table-free CRC-16 with a daemon-specific polynomial and
//! seed. It matches neither CCITT nor IBM; the daemon recomputes it over
//! every body it receives, so the constants must not change.

/// Reflected polynomial.
pub const POLYNOMIAL: u16 = 0xC86C;

/// Accumulator seed. Also the checksum of an empty body.
pub const INITIAL: u16 = 0x3C7E;

/// Compute the checksum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(INITIAL, |acc, &byte| {
        let mut low = (acc ^ byte as u16) & 0x00FF;
        for _ in 0..8 {
            low = if low & 1 != 0 {
                (low >> 1) ^ POLYNOMIAL
            } else {
                low >> 1
            };
        }
        low ^ (acc >> 8)
    })
}
