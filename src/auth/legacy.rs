//! Legacy DES/3DES mutual authentication (opcode 0x0A), spec §4.5.1.
//!
//! No session keys are derived; a successful run only proves possession
//! of the key and sets `authenticated`/`key_no`.

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::apdu::ADDITIONAL_FRAME;
use crate::crypto::des;
use crate::crypto::util::{random_bytes, rol1};
use crate::engine::{status_to_error, Engine};
use crate::error::{DesfireError, Result};
use crate::transport::ReaderTransport;
use crate::types::KeyNo;

pub const OPCODE: u8 = 0x0A;

pub struct Outcome {
    pub key_no: KeyNo,
}

/// Run the handshake against `key_no` using `key` (16 bytes selects
/// 2TDEA, 24 bytes selects 3TDEA).
pub fn authenticate<T: ReaderTransport>(
    engine: &mut Engine<T>,
    key_no: KeyNo,
    key: &[u8],
) -> Result<Outcome> {
    let (sw1, rnd_b) = engine.raw_exchange_with_data(OPCODE, &[key_no])?;
    if !sw1.is_continuation() {
        return Err(status_to_error(sw1));
    }
    if rnd_b.len() != 8 {
        return Err(DesfireError::CryptoLength);
    }
    let mut rnd_b = Zeroizing::new(rnd_b);
    let iv1: [u8; 8] = rnd_b.to_vec().try_into().unwrap();
    des::cbc_decrypt(key, &[0u8; 8], &mut rnd_b);

    let rnd_a = random_bytes(8);
    let mut challenge = rnd_a.clone();
    challenge.extend_from_slice(&rol1(&rnd_b));
    des::cbc_encrypt(key, &iv1, &mut challenge);
    let iv2: [u8; 8] = challenge[8..16].try_into().unwrap();

    let (sw2, rnd_a_prime) = engine.raw_exchange_with_data(ADDITIONAL_FRAME, &challenge)?;
    if !sw2.is_success() {
        return Err(status_to_error(sw2));
    }
    if rnd_a_prime.len() != 8 {
        return Err(DesfireError::CryptoLength);
    }
    let mut rnd_a_prime = Zeroizing::new(rnd_a_prime);
    des::cbc_decrypt(key, &iv2, &mut rnd_a_prime);

    let expected = Zeroizing::new(rol1(&rnd_a));
    if rnd_a_prime.ct_eq(&expected[..]).unwrap_u8() != 1 {
        return Err(DesfireError::AuthFailed(sw2.sw1, sw2.sw2));
    }

    Ok(Outcome { key_no })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::transport::ReaderTransport;

    /// A fake card that speaks the Legacy DES handshake for a known key,
    /// used to exercise the full round-trip without real hardware.
    struct FakeCard {
        key: Vec<u8>,
        rnd_b: [u8; 8],
        step: u8,
    }

    impl FakeCard {
        fn new(key: Vec<u8>, rnd_b: [u8; 8]) -> Self {
            FakeCard { key, rnd_b, step: 0 }
        }
    }

    impl ReaderTransport for FakeCard {
        fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>> {
            match self.step {
                0 => {
                    self.step = 1;
                    let mut enc = self.rnd_b.to_vec();
                    des::cbc_encrypt(&self.key, &[0u8; 8], &mut enc);
                    enc.extend_from_slice(&[0x91, 0xAF]);
                    Ok(enc)
                }
                _ => {
                    // second leg: command = 90 AF 00 00 10 <challenge 16 bytes>
                    let challenge = &command[5..21];
                    let iv2: [u8; 8] = challenge[8..16].try_into().unwrap();
                    let mut rnd_a_cipher = challenge[0..8].to_vec();
                    let mut enc_rnd_b = self.rnd_b.to_vec();
                    des::cbc_encrypt(&self.key, &[0u8; 8], &mut enc_rnd_b);
                    let iv1: [u8; 8] = enc_rnd_b.try_into().unwrap();
                    des::cbc_decrypt(&self.key, &iv1, &mut rnd_a_cipher);
                    let rnd_a = rnd_a_cipher;
                    let mut expected = rol1(&rnd_a);
                    des::cbc_encrypt(&self.key, &iv2, &mut expected);
                    expected.extend_from_slice(&[0x91, 0x00]);
                    Ok(expected)
                }
            }
        }
    }

    #[test]
    fn full_handshake_succeeds_with_matching_key() {
        let key = vec![0x00u8; 16];
        let rnd_b = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
        let card = FakeCard::new(key.clone(), rnd_b);
        let mut engine = Engine::new(card);
        let outcome = authenticate(&mut engine, 0, &key).unwrap();
        assert_eq!(outcome.key_no, 0);
    }
}
