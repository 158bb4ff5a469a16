//! EV2First/EV2NonFirst authentication (opcodes 0x71/0x77), spec §4.5.3,
//! §4.5.4.
//!
//! Both handshakes share the same challenge/response shape and CMAC-based
//! session-key derivation; they differ only in whether the card's second
//! response carries a fresh transaction identifier.

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::apdu::ADDITIONAL_FRAME;
use crate::crypto::aes as aes_crypto;
use crate::crypto::cmac;
use crate::crypto::util::{random_bytes, rol1};
use crate::engine::{status_to_error, Engine};
use crate::error::{DesfireError, Result};
use crate::session::SessionKeys;
use crate::transport::ReaderTransport;
use crate::types::KeyNo;

pub const OPCODE_FIRST: u8 = 0x71;
pub const OPCODE_NON_FIRST: u8 = 0x77;

pub struct FirstOutcome {
    pub key_no: KeyNo,
    pub keys: SessionKeys,
    pub ti: [u8; 4],
}

pub struct NonFirstOutcome {
    pub key_no: KeyNo,
    pub keys: SessionKeys,
}

pub fn authenticate_first<T: ReaderTransport>(
    engine: &mut Engine<T>,
    key_no: KeyNo,
    key: &[u8; 16],
) -> Result<FirstOutcome> {
    let (rnd_a, rnd_b, ti) = run_handshake(engine, OPCODE_FIRST, key_no, key, true)?;
    let ti = ti.expect("EV2First always returns a transaction identifier");
    let keys = derive_session_keys(key, &rnd_a, &rnd_b);
    Ok(FirstOutcome { key_no, keys, ti })
}

pub fn authenticate_non_first<T: ReaderTransport>(
    engine: &mut Engine<T>,
    key_no: KeyNo,
    key: &[u8; 16],
) -> Result<NonFirstOutcome> {
    let (rnd_a, rnd_b, _) = run_handshake(engine, OPCODE_NON_FIRST, key_no, key, false)?;
    let keys = derive_session_keys(key, &rnd_a, &rnd_b);
    Ok(NonFirstOutcome { key_no, keys })
}

fn run_handshake<T: ReaderTransport>(
    engine: &mut Engine<T>,
    opcode: u8,
    key_no: KeyNo,
    key: &[u8; 16],
    expect_ti: bool,
) -> Result<(Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>, Option<[u8; 4]>)> {
    // PCDcap2 = 0x00 0x00: this host advertises no extended capabilities.
    let (sw1, rnd_b) = engine.raw_exchange_with_data(opcode, &[key_no, 0x00, 0x00])?;
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

    let (sw2, resp) = engine.raw_exchange_with_data(ADDITIONAL_FRAME, &challenge)?;
    if !sw2.is_success() {
        return Err(status_to_error(sw2));
    }

    let (ti, mut rnd_a_prime) = if expect_ti {
        if resp.len() < 20 {
            return Err(DesfireError::CryptoLength);
        }
        let ti: [u8; 4] = resp[0..4].try_into().unwrap();
        (Some(ti), Zeroizing::new(resp[4..20].to_vec()))
    } else {
        if resp.len() < 16 {
            return Err(DesfireError::CryptoLength);
        }
        (None, Zeroizing::new(resp[0..16].to_vec()))
    };
    aes_crypto::cbc_decrypt(key, &[0u8; 16], &mut rnd_a_prime);

    let expected = Zeroizing::new(rol1(&rnd_a));
    if rnd_a_prime.ct_eq(&expected[..]).unwrap_u8() != 1 {
        return Err(DesfireError::AuthFailed(sw2.sw1, sw2.sw2));
    }

    Ok((rnd_a, rnd_b, ti))
}

/// CMAC-based session key derivation (spec §4.5.3).
fn derive_session_keys(auth_key: &[u8; 16], rnd_a: &[u8], rnd_b: &[u8]) -> SessionKeys {
    let sv1 = build_sv(0xA5, 0x5A, rnd_a, rnd_b);
    let sv2 = build_sv(0x5A, 0xA5, rnd_a, rnd_b);
    SessionKeys {
        enc_key: cmac::aes_cmac(auth_key, &sv1),
        mac_key: cmac::aes_cmac(auth_key, &sv2),
    }
}

fn build_sv(b0: u8, b1: u8, rnd_a: &[u8], rnd_b: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut sv = Zeroizing::new(vec![b0, b1, 0x00, 0x01, 0x00, 0x80]);
    sv.extend_from_slice(&rnd_a[0..2]);
    sv.extend_from_slice(&rnd_b[0..2]);
    sv.extend_from_slice(&rnd_a[13..16]);
    sv.extend_from_slice(&rnd_b[13..16]);
    sv
}
