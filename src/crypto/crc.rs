//! CRC32 (ISO 3309, used to authenticate `ChangeKeyEV2` plaintext) and
//! CRC16 (CCITT reflected, DESFire init `0x6363`), per spec §4.2.

use crc::{Algorithm, Crc};

const CRC16_DESFIRE: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0x6363,
    refin: true,
    refout: true,
    xorout: 0x0000,
    check: 0xBF05,
    residue: 0x0000,
};

/// CRC32 (reflected, poly 0xEDB88320, init 0xFFFFFFFF, xorout 0xFFFFFFFF),
/// serialized the way spec §8's golden vector pins it:
/// `crc32(b"123456789") == [0xCB, 0xF4, 0x39, 0x26]`.
pub fn crc32(data: &[u8]) -> [u8; 4] {
    let crc = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
    crc.checksum(data).to_be_bytes()
}

/// CRC16-CCITT, reflected, with the DESFire initial value `0x6363`.
pub fn crc16(data: &[u8]) -> [u8; 2] {
    let crc = Crc::<u16>::new(&CRC16_DESFIRE);
    crc.checksum(data).to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_of_empty_is_zero() {
        assert_eq!(crc32(b""), [0, 0, 0, 0]);
    }

    #[test]
    fn crc32_golden_vector() {
        assert_eq!(crc32(b"123456789"), [0xCB, 0xF4, 0x39, 0x26]);
    }

    #[test]
    fn crc16_of_empty_is_init_value() {
        assert_eq!(crc16(b""), [0x63, 0x63]);
    }

    #[test]
    fn crc16_golden_vector() {
        assert_eq!(crc16(b"123456789"), [0x05, 0xBF]);
    }
}
