//! CRC-8 frame checksum (polynomial 0x07, initial value 0).

/// Generator polynomial, x^8 + x^2 + x + 1.
const POLYNOMIAL: u8 = 0x07;

static CRC_TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut index = 0;
    while index < 256 {
        let mut crc = index as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[index] = crc;
        index += 1;
    }
    table
}

/// Fold one byte into the running checksum.
#[inline]
#[must_use]
pub fn update(crc: u8, byte: u8) -> u8 {
    CRC_TABLE[usize::from(crc ^ byte)]
}

/// Fold a byte slice into the running checksum.
#[must_use]
pub fn update_slice(crc: u8, data: &[u8]) -> u8 {
    data.iter().fold(crc, |acc, &byte| update(acc, byte))
}

/// Checksum of `data` starting from a zero accumulator.
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    update_slice(0, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_reference_entries() {
        assert_eq!(CRC_TABLE[0], 0x00);
        assert_eq!(CRC_TABLE[1], 0x07);
        assert_eq!(CRC_TABLE[2], 0x0E);
        assert_eq!(CRC_TABLE[3], 0x09);
        assert_eq!(CRC_TABLE[0x80], 0x89);
        assert_eq!(CRC_TABLE[255], 0xF3);
    }

    #[test]
    fn check_value() {
        assert_eq!(checksum(b"123456789"), 0xF4);
    }

    #[test]
    fn byte_and_slice_forms_agree() {
        let data = [0x20, 0x0C, 0x00, 0x00, 0x00, 0x10, 0x00, 0xAA];
        let folded = data.iter().fold(0, |acc, &b| update(acc, b));
        assert_eq!(folded, update_slice(0, &data));
        assert_eq!(update_slice(update_slice(0, &data[..3]), &data[3..]), folded);
    }

    #[test]
    fn every_single_bit_flip_changes_checksum() {
        let data: Vec<u8> = (0..=255u8).collect();
        let reference = checksum(&data);
        for index in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data.clone();
                corrupted[index] ^= 1 << bit;
                assert_ne!(checksum(&corrupted), reference, "byte {index} bit {bit}");
            }
        }
    }
}
