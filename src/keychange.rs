//! Secure key change and key-set rollover (spec §4.6).

use crate::crypto::aes as aes_crypto;
use crate::crypto::crc;
use crate::crypto::util::pad_80;
use crate::engine::{status_to_error, Engine};
use crate::error::{DesfireError, Result};
use crate::session::SessionState;
use crate::transport::ReaderTransport;
use crate::types::KeyNo;

pub const CHANGE_KEY_EV2: u8 = 0xC6;
pub const CHANGE_KEY_LEGACY: u8 = 0xC4;
pub const INITIALIZE_KEY_SET: u8 = 0x56;
pub const ROLL_KEY_SET: u8 = 0x55;
pub const FINALIZE_KEY_SET: u8 = 0x57;

/// `ChangeKeyEV2` (spec §4.6): session-encrypted `NewKey ‖ Version ‖ CRC32`,
/// padded to a 16-byte multiple (21 bytes pads to 32). Requires an active
/// EV2 session.
pub fn change_key_ev2<T: ReaderTransport>(
    engine: &mut Engine<T>,
    session: &SessionState,
    key_no: KeyNo,
    new_key: &[u8; 16],
    new_key_version: u8,
) -> Result<()> {
    if !session.authenticated {
        return Err(DesfireError::PreconditionNotAuthenticated);
    }

    let mut ciphertext = build_plaintext(key_no, new_key, new_key_version);
    aes_crypto::cbc_encrypt(&session.keys.enc_key, &[0u8; 16], &mut ciphertext);

    let mut frame = vec![key_no];
    frame.extend_from_slice(&ciphertext);

    let (sw, _) = engine.transceive_with_data(CHANGE_KEY_EV2, &frame)?;
    if !sw.is_success() {
        return Err(status_to_error(sw));
    }
    Ok(())
}

/// Build the `NewKey ‖ Version ‖ CRC32` plaintext, padded to a 16-byte
/// multiple, before session encryption.
fn build_plaintext(key_no: KeyNo, new_key: &[u8; 16], new_key_version: u8) -> Vec<u8> {
    let mut plain = new_key.to_vec();
    plain.push(new_key_version);

    let mut crc_input = vec![CHANGE_KEY_EV2, key_no];
    crc_input.extend_from_slice(&plain);
    plain.extend_from_slice(&crc::crc32(&crc_input));

    pad_80(&mut plain, 16);
    plain
}

/// Legacy `ChangeKey` (spec §4.6): unencrypted, intended only for moving
/// off factory-default keys, with extreme care.
pub fn change_key_legacy<T: ReaderTransport>(
    engine: &mut Engine<T>,
    key_no: KeyNo,
    new_key: &[u8],
    new_key_version: u8,
) -> Result<()> {
    let mut frame = vec![key_no];
    frame.extend_from_slice(new_key);
    frame.push(new_key_version);

    let (sw, _) = engine.transceive_with_data(CHANGE_KEY_LEGACY, &frame)?;
    if !sw.is_success() {
        return Err(status_to_error(sw));
    }
    Ok(())
}

/// `InitializeKeySet` (0x56). Requires an active authenticated session.
pub fn initialize_key_set<T: ReaderTransport>(
    engine: &mut Engine<T>,
    session: &SessionState,
    key_set_no: u8,
    key_type: u8,
) -> Result<()> {
    require_authenticated(session)?;
    let (sw, _) = engine.transceive_with_data(INITIALIZE_KEY_SET, &[key_set_no, key_type])?;
    if !sw.is_success() {
        return Err(status_to_error(sw));
    }
    Ok(())
}

/// `RollKeySet` (0x55). Requires an active authenticated session.
pub fn roll_key_set<T: ReaderTransport>(
    engine: &mut Engine<T>,
    session: &SessionState,
    key_set_no: u8,
) -> Result<()> {
    require_authenticated(session)?;
    let (sw, _) = engine.transceive_with_data(ROLL_KEY_SET, &[key_set_no])?;
    if !sw.is_success() {
        return Err(status_to_error(sw));
    }
    Ok(())
}

/// `FinalizeKeySet` (0x57). Requires an active authenticated session.
pub fn finalize_key_set<T: ReaderTransport>(
    engine: &mut Engine<T>,
    session: &SessionState,
) -> Result<()> {
    require_authenticated(session)?;
    let (sw, _) = engine.transceive(FINALIZE_KEY_SET)?;
    if !sw.is_success() {
        return Err(status_to_error(sw));
    }
    Ok(())
}

fn require_authenticated(session: &SessionState) -> Result<()> {
    if session.authenticated {
        Ok(())
    } else {
        Err(DesfireError::PreconditionNotAuthenticated)
    }
}
