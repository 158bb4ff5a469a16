//! AES-CMAC (NIST SP 800-38B), spec §4.2.
//!
//! Tag computation is delegated to the `cmac` crate; subkey derivation is
//! also implemented by hand so the SP 800-38B invariant
//! (`K2 = left_shift(K1) XOR Rb` when `msb(K1)` is set) is directly
//! testable, per spec §8.

use aes::Aes128;
use cmac::{Cmac, Mac};

use super::aes::ecb_encrypt_block;

const RB: [u8; 16] = {
    let mut rb = [0u8; 16];
    rb[15] = 0x87;
    rb
};

/// Left-shift a 16-byte block by one bit, returning the shifted block and
/// the bit shifted out (the original MSB).
fn shift_left_one_bit(block: [u8; 16]) -> ([u8; 16], bool) {
    let msb = (block[0] & 0x80) != 0;
    let mut out = [0u8; 16];
    let mut carry = 0u8;
    for i in (0..16).rev() {
        out[i] = (block[i] << 1) | carry;
        carry = (block[i] >> 7) & 1;
    }
    (out, msb)
}

fn xor16(a: [u8; 16], b: [u8; 16]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = a[i] ^ b[i];
    }
    out
}

/// Derive the CMAC subkeys K1, K2 from `key` (NIST SP 800-38B §6.1).
pub fn derive_subkeys(key: &[u8; 16]) -> ([u8; 16], [u8; 16]) {
    let mut l = [0u8; 16];
    ecb_encrypt_block(key, &mut l);

    let (k1_shifted, msb_l) = shift_left_one_bit(l);
    let k1 = if msb_l { xor16(k1_shifted, RB) } else { k1_shifted };

    let (k2_shifted, msb_k1) = shift_left_one_bit(k1);
    let k2 = if msb_k1 { xor16(k2_shifted, RB) } else { k2_shifted };

    (k1, k2)
}

/// Compute the full 16-byte AES-CMAC of `msg` under `key`.
pub fn aes_cmac(key: &[u8; 16], msg: &[u8]) -> [u8; 16] {
    let mut mac = Cmac::<Aes128>::new_from_slice(key).expect("16-byte key");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}

/// Compute an AES-CMAC truncated to `len` bytes (`len` defaults to 16 per
/// spec §4.2).
pub fn aes_cmac_truncated(key: &[u8; 16], msg: &[u8], len: usize) -> Vec<u8> {
    aes_cmac(key, msg)[..len].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// NIST SP 800-38B example key: subkeys from the published test vectors.
    #[test]
    fn subkey_derivation_matches_nist_vectors() {
        let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
        let (k1, k2) = derive_subkeys(&key);
        assert_eq!(k1, hex!("fbeed618357133667c85e08f7236a8de"));
        assert_eq!(k2, hex!("f7ddac306ae266ccf90bc11ee46d513b"));
    }

    #[test]
    fn subkey_invariant_holds() {
        let key = [0x42u8; 16];
        let (k1, k2) = derive_subkeys(&key);
        let (shifted, msb) = shift_left_one_bit(k1);
        let expected = if msb { xor16(shifted, RB) } else { shifted };
        assert_eq!(k2, expected);
    }

    #[test]
    fn cmac_matches_nist_vectors() {
        let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
        // Empty message, NIST SP 800-38B example 1.
        assert_eq!(aes_cmac(&key, b""), hex!("bb1d6929e95937287fa37d129b756746"));
        // 16-byte message, example 2.
        let msg = hex!("6bc1bee22e409f96e93d7e117393172a");
        assert_eq!(aes_cmac(&key, &msg), hex!("070a16b46b4d4144f79bdd9dd04a287c"));
    }
}
