//! Legacy DES/3DES-CBC (spec §4.2): two-key EDE for a 16-byte key (K1,K2,K1),
//! three-key EDE for a 24-byte key (K1,K2,K3), 8-byte blocks, no padding.

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use des::{TdesEde2, TdesEde3};

/// Encrypt `data` in place under CBC. `key` must be 16 or 24 bytes;
/// `data.len()` must be a multiple of 8.
pub fn cbc_encrypt(key: &[u8], iv: &[u8; 8], data: &mut [u8]) {
    match key.len() {
        16 => {
            cbc::Encryptor::<TdesEde2>::new(key.into(), iv.into())
                .encrypt_padded_mut::<NoPadding>(data, data.len())
                .expect("length is a multiple of the DES block size");
        }
        24 => {
            cbc::Encryptor::<TdesEde3>::new(key.into(), iv.into())
                .encrypt_padded_mut::<NoPadding>(data, data.len())
                .expect("length is a multiple of the DES block size");
        }
        n => panic!("3DES key must be 16 or 24 bytes, got {n}"),
    }
}

/// Decrypt `data` in place under CBC. `key` must be 16 or 24 bytes;
/// `data.len()` must be a multiple of 8.
pub fn cbc_decrypt(key: &[u8], iv: &[u8; 8], data: &mut [u8]) {
    match key.len() {
        16 => {
            cbc::Decryptor::<TdesEde2>::new(key.into(), iv.into())
                .decrypt_padded_mut::<NoPadding>(data)
                .expect("length is a multiple of the DES block size");
        }
        24 => {
            cbc::Decryptor::<TdesEde3>::new(key.into(), iv.into())
                .decrypt_padded_mut::<NoPadding>(data)
                .expect("length is a multiple of the DES block size");
        }
        n => panic!("3DES key must be 16 or 24 bytes, got {n}"),
    }
}
