//! AES-128 ECB/CBC with no implicit padding (spec §4.2).

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cbc::cipher::block_padding::NoPadding;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Encrypt `data` in place under AES-128-CBC with no padding. `data.len()`
/// must be a multiple of 16.
pub fn cbc_encrypt(key: &[u8; 16], iv: &[u8; 16], data: &mut [u8]) {
    let enc = Aes128CbcEnc::new(key.into(), iv.into());
    enc.encrypt_padded_mut::<NoPadding>(data, data.len())
        .expect("length is a multiple of the AES block size");
}

/// Decrypt `data` in place under AES-128-CBC with no padding. `data.len()`
/// must be a multiple of 16.
pub fn cbc_decrypt(key: &[u8; 16], iv: &[u8; 16], data: &mut [u8]) {
    let dec = Aes128CbcDec::new(key.into(), iv.into());
    dec.decrypt_padded_mut::<NoPadding>(data)
        .expect("length is a multiple of the AES block size");
}

/// Encrypt a single 16-byte block under AES-128-ECB.
pub fn ecb_encrypt_block(key: &[u8; 16], block: &mut [u8; 16]) {
    let cipher = Aes128::new(key.into());
    cipher.encrypt_block(block.into());
}

/// Decrypt a single 16-byte block under AES-128-ECB.
pub fn ecb_decrypt_block(key: &[u8; 16], block: &mut [u8; 16]) {
    let cipher = Aes128::new(key.into());
    cipher.decrypt_block(block.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbc_round_trips() {
        let key = [0x2B; 16];
        let iv = [0u8; 16];
        let mut buf = [0x11u8; 32];
        let original = buf;
        cbc_encrypt(&key, &iv, &mut buf);
        assert_ne!(buf, original);
        cbc_decrypt(&key, &iv, &mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn ecb_round_trips() {
        let key = [0x5Au8; 16];
        let mut block = [0x01u8; 16];
        let original = block;
        ecb_encrypt_block(&key, &mut block);
        assert_ne!(block, original);
        ecb_decrypt_block(&key, &mut block);
        assert_eq!(block, original);
    }
}
