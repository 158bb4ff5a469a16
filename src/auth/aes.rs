//! AES authentication (opcode 0xAA), spec §4.5.2.
//!
//! Session keys are derived by byte splicing, not CMAC — this handshake
//! predates EV2 and is kept separate from [`super::ev2`].

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::apdu::ADDITIONAL_FRAME;
use crate::crypto::aes as aes_crypto;
use crate::crypto::util::{random_bytes, rol1};
use crate::engine::{status_to_error, Engine};
use crate::error::{DesfireError, Result};
use crate::session::SessionKeys;
use crate::transport::ReaderTransport;
use crate::types::KeyNo;

pub const OPCODE: u8 = 0xAA;

pub struct Outcome {
    pub key_no: KeyNo,
    pub keys: SessionKeys,
}

pub fn authenticate<T: ReaderTransport>(
    engine: &mut Engine<T>,
    key_no: KeyNo,
    key: &[u8; 16],
) -> Result<Outcome> {
    let (sw1, rnd_b) = engine.raw_exchange_with_data(OPCODE, &[key_no])?;
    if !sw1.is_continuation() {
        return Err(status_to_error(sw1));
    }
    if rnd_b.len() != 16 {
        return Err(DesfireError::CryptoLength);
    }
    let mut rnd_b = Zeroizing::new(rnd_b);
    aes_crypto::cbc_decrypt(key, &[0u8; 16], &mut rnd_b);

    let rnd_a = random_bytes(16);
    let mut challenge = rnd_a.clone();
    challenge.extend_from_slice(&rol1(&rnd_b));
    aes_crypto::cbc_encrypt(key, &[0u8; 16], &mut challenge);

    let (sw2, rnd_a_prime) = engine.raw_exchange_with_data(ADDITIONAL_FRAME, &challenge)?;
    if !sw2.is_success() {
        return Err(status_to_error(sw2));
    }
    if rnd_a_prime.len() != 16 {
        return Err(DesfireError::CryptoLength);
    }
    let mut rnd_a_prime = Zeroizing::new(rnd_a_prime);
    aes_crypto::cbc_decrypt(key, &[0u8; 16], &mut rnd_a_prime);

    let expected = Zeroizing::new(rol1(&rnd_a));
    if rnd_a_prime.ct_eq(&expected[..]).unwrap_u8() != 1 {
        return Err(DesfireError::AuthFailed(sw2.sw1, sw2.sw2));
    }

    let keys = derive_session_keys(&rnd_a, &rnd_b);
    Ok(Outcome { key_no, keys })
}

/// Byte-splicing session key derivation (spec §4.5.2), not CMAC.
fn derive_session_keys(rnd_a: &[u8], rnd_b: &[u8]) -> SessionKeys {
    let mut enc_key = [0u8; 16];
    enc_key[0..4].copy_from_slice(&rnd_a[0..4]);
    enc_key[4..8].copy_from_slice(&rnd_b[0..4]);
    enc_key[8..12].copy_from_slice(&rnd_a[12..16]);
    enc_key[12..16].copy_from_slice(&rnd_b[12..16]);

    let mut mac_key = [0u8; 16];
    mac_key[0..4].copy_from_slice(&rnd_a[4..8]);
    mac_key[4..8].copy_from_slice(&rnd_b[4..8]);
    mac_key[8..12].copy_from_slice(&rnd_a[8..12]);
    mac_key[12..16].copy_from_slice(&rnd_b[8..12]);

    SessionKeys { enc_key, mac_key }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// Spec §8 scenario 2: the byte-splicing vectors given verbatim.
    #[test]
    fn byte_splicing_matches_spec_vector() {
        let rnd_a = hex!("A1A2A3A4A5A6A7A8A9AAABACADAEAFB0");
        let rnd_b = hex!("B1B2B3B4B5B6B7B8B9BABBBCBDBEBFC0");
        let keys = derive_session_keys(&rnd_a, &rnd_b);
        assert_eq!(
            keys.enc_key,
            hex!("A1A2A3A4B1B2B3B4ADAEAFB0BDBEBFC0")
        );
        assert_eq!(
            keys.mac_key,
            hex!("A5A6A7A8B5B6B7B8A9AAABACB9BABBBC")
        );
    }
}
