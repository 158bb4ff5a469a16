//! Application and file operations (spec §4.7).
//!
//! Each function is a thin encoder/decoder around one DESFire opcode; all
//! of them ride the [`Engine`]'s Le-negotiation, retry, and continuation
//! reassembly, so the caller only ever sees one accumulated payload or a
//! typed error (spec §9 "Do not hide continuation" — that guarantee is
//! for *this* layer; low-level callers use [`Engine::raw_exchange`]
//! directly if they need to see `91 AF` themselves).

use crate::engine::{status_to_error, Engine};
use crate::error::{DesfireError, Result};
use crate::session::SessionState;
use crate::transport::ReaderTransport;
use crate::types::{Aid, AccessRights, FileNo, KeyType, ValueFileParams};

const GET_VERSION: u8 = 0x60;
const GET_APPLICATION_IDS: u8 = 0x6A;
const CREATE_APPLICATION: u8 = 0xCA;
const SELECT_APPLICATION: u8 = 0x5A;
const CREATE_STD_DATA_FILE: u8 = 0xCD;
const CREATE_BACKUP_DATA_FILE: u8 = 0xCB;
const CREATE_VALUE_FILE: u8 = 0xCC;
const READ_DATA: u8 = 0xBD;
const WRITE_DATA: u8 = 0x3D;
const GET_VALUE: u8 = 0x6C;
const CREDIT: u8 = 0x0C;
const DEBIT: u8 = 0xDC;
const LIMITED_CREDIT: u8 = 0x1C;
const COMMIT_TRANSACTION: u8 = 0xC7;
const ABORT_TRANSACTION: u8 = 0xA7;
const GET_KEY_SETTINGS: u8 = 0x45;
const FORMAT_PICC: u8 = 0xFC;
const GET_FREE_MEMORY: u8 = 0x6E;

/// `GetVersion` (0x60): three 7-byte blocks (hardware, software, UID),
/// reassembled transparently by the engine across `91 AF` continuations.
pub fn get_version<T: ReaderTransport>(engine: &mut Engine<T>) -> Result<Vec<u8>> {
    let (sw, data) = engine.transceive(GET_VERSION)?;
    require_success(sw, data)
}

/// `GetApplicationIDs` (0x6A): a sequence of 3-byte little-endian AIDs.
pub fn get_application_ids<T: ReaderTransport>(engine: &mut Engine<T>) -> Result<Vec<Aid>> {
    let (sw, data) = engine.transceive(GET_APPLICATION_IDS)?;
    let data = require_success(sw, data)?;
    if data.len() % 3 != 0 {
        return Err(DesfireError::Protocol(format!(
            "GetApplicationIDs payload length {} is not a multiple of 3",
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(3)
        .map(|c| Aid::from_le_bytes([c[0], c[1], c[2]]))
        .collect())
}

/// Pack `(numKeys, keyType)` the way `GetKeySettings` reports it: lower 6
/// bits are the key count, upper 2 bits the cipher family (`0x80` = AES).
fn pack_key_settings(num_keys: u8, key_type: KeyType) -> u8 {
    let type_bits = match key_type {
        KeyType::Des => 0x00,
        KeyType::TripleDes => 0x40,
        KeyType::Aes => 0x80,
    };
    (num_keys & 0x3F) | type_bits
}

fn unpack_key_settings(byte: u8) -> (u8, KeyType) {
    let key_type = match byte & 0xC0 {
        0x80 => KeyType::Aes,
        0x40 => KeyType::TripleDes,
        _ => KeyType::Des,
    };
    (byte & 0x3F, key_type)
}

/// `CreateApplication` (0xCA).
pub fn create_application<T: ReaderTransport>(
    engine: &mut Engine<T>,
    aid: Aid,
    key_settings: u8,
    num_keys: u8,
    key_type: KeyType,
) -> Result<()> {
    let mut data = aid.to_le_bytes().to_vec();
    data.push(key_settings);
    data.push(pack_key_settings(num_keys, key_type));
    let (sw, resp) = engine.transceive_with_data(CREATE_APPLICATION, &data)?;
    require_success(sw, resp).map(|_| ())
}

/// `SelectApplication` (0x5A). On success, updates `session.current_app`
/// and unconditionally clears authentication (spec §3 invariant).
pub fn select_application<T: ReaderTransport>(
    engine: &mut Engine<T>,
    session: &mut SessionState,
    aid: Aid,
) -> Result<()> {
    let (sw, resp) = engine.transceive_with_data(SELECT_APPLICATION, &aid.to_le_bytes())?;
    require_success(sw, resp)?;
    session.select_application(aid);
    Ok(())
}

/// File kind for [`create_data_file`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataFileKind {
    Standard,
    Backup,
}

/// `CreateStdDataFile` (0xCD) / `CreateBackupDataFile` (0xCB).
pub fn create_data_file<T: ReaderTransport>(
    engine: &mut Engine<T>,
    kind: DataFileKind,
    file_no: FileNo,
    comm_settings: u8,
    access_rights: AccessRights,
    file_size: u32,
) -> Result<()> {
    let opcode = match kind {
        DataFileKind::Standard => CREATE_STD_DATA_FILE,
        DataFileKind::Backup => CREATE_BACKUP_DATA_FILE,
    };
    let mut data = vec![file_no, comm_settings];
    data.extend_from_slice(&access_rights.pack());
    let size = file_size.to_le_bytes();
    data.extend_from_slice(&size[0..3]);
    let (sw, resp) = engine.transceive_with_data(opcode, &data)?;
    require_success(sw, resp).map(|_| ())
}

/// `CreateValueFile` (0xCC).
pub fn create_value_file<T: ReaderTransport>(
    engine: &mut Engine<T>,
    file_no: FileNo,
    comm_settings: u8,
    access_rights: AccessRights,
    params: ValueFileParams,
) -> Result<()> {
    let mut data = vec![file_no, comm_settings];
    data.extend_from_slice(&access_rights.pack());
    data.extend_from_slice(&params.to_bytes());
    let (sw, resp) = engine.transceive_with_data(CREATE_VALUE_FILE, &data)?;
    require_success(sw, resp).map(|_| ())
}

fn le3(value: u32) -> [u8; 3] {
    let b = value.to_le_bytes();
    [b[0], b[1], b[2]]
}

/// `ReadData` (0xBD): reassembles continuation frames transparently.
pub fn read_data<T: ReaderTransport>(
    engine: &mut Engine<T>,
    file_no: FileNo,
    offset: u32,
    length: u32,
) -> Result<Vec<u8>> {
    let mut data = vec![file_no];
    data.extend_from_slice(&le3(offset));
    data.extend_from_slice(&le3(length));
    let (sw, resp) = engine.transceive_with_data(READ_DATA, &data)?;
    require_success(sw, resp)
}

/// `WriteData` (0x3D): chunked at a conservative per-frame payload budget
/// with `ADDITIONAL_FRAME` continuations (spec §4.4, §4.7).
pub fn write_data<T: ReaderTransport>(
    engine: &mut Engine<T>,
    file_no: FileNo,
    offset: u32,
    payload: &[u8],
) -> Result<()> {
    let mut header = vec![file_no];
    header.extend_from_slice(&le3(offset));
    header.extend_from_slice(&le3(payload.len() as u32));
    let (sw, resp) = engine.write_chunked(WRITE_DATA, &header, payload)?;
    require_success(sw, resp).map(|_| ())
}

/// `GetValue` (0x6C): decodes a 4-byte signed little-endian balance.
pub fn get_value<T: ReaderTransport>(engine: &mut Engine<T>, file_no: FileNo) -> Result<i32> {
    let (sw, resp) = engine.transceive_with_data(GET_VALUE, &[file_no])?;
    let data = require_success(sw, resp)?;
    if data.len() != 4 {
        return Err(DesfireError::CryptoLength);
    }
    Ok(i32::from_le_bytes(data.try_into().unwrap()))
}

fn value_op<T: ReaderTransport>(
    engine: &mut Engine<T>,
    opcode: u8,
    file_no: FileNo,
    amount: i32,
) -> Result<()> {
    let mut data = vec![file_no];
    data.extend_from_slice(&amount.to_le_bytes());
    let (sw, resp) = engine.transceive_with_data(opcode, &data)?;
    require_success(sw, resp).map(|_| ())
}

/// `Credit` (0x0C). Must be followed by [`commit_transaction`] to persist.
pub fn credit<T: ReaderTransport>(engine: &mut Engine<T>, file_no: FileNo, amount: i32) -> Result<()> {
    value_op(engine, CREDIT, file_no, amount)
}

/// `Debit` (0xDC). Must be followed by [`commit_transaction`] to persist.
pub fn debit<T: ReaderTransport>(engine: &mut Engine<T>, file_no: FileNo, amount: i32) -> Result<()> {
    value_op(engine, DEBIT, file_no, amount)
}

/// `LimitedCredit` (0x1C). Must be followed by [`commit_transaction`].
pub fn limited_credit<T: ReaderTransport>(
    engine: &mut Engine<T>,
    file_no: FileNo,
    amount: i32,
) -> Result<()> {
    value_op(engine, LIMITED_CREDIT, file_no, amount)
}

/// `CommitTransaction` (0xC7).
pub fn commit_transaction<T: ReaderTransport>(engine: &mut Engine<T>) -> Result<()> {
    let (sw, resp) = engine.transceive(COMMIT_TRANSACTION)?;
    require_success(sw, resp).map(|_| ())
}

/// `AbortTransaction` (0xA7).
pub fn abort_transaction<T: ReaderTransport>(engine: &mut Engine<T>) -> Result<()> {
    let (sw, resp) = engine.transceive(ABORT_TRANSACTION)?;
    require_success(sw, resp).map(|_| ())
}

/// Decoded `GetKeySettings` response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeySettings {
    pub settings: u8,
    pub max_keys: u8,
    pub key_type: KeyType,
}

/// `GetKeySettings` (0x45).
pub fn get_key_settings<T: ReaderTransport>(engine: &mut Engine<T>) -> Result<KeySettings> {
    let (sw, resp) = engine.transceive(GET_KEY_SETTINGS)?;
    let data = require_success(sw, resp)?;
    if data.len() != 2 {
        return Err(DesfireError::Protocol(format!(
            "GetKeySettings payload length {} != 2",
            data.len()
        )));
    }
    let (max_keys, key_type) = unpack_key_settings(data[1]);
    Ok(KeySettings {
        settings: data[0],
        max_keys,
        key_type,
    })
}

/// `FormatPICC` (0xFC). Requires a PICC-level authenticated session.
pub fn format_picc<T: ReaderTransport>(engine: &mut Engine<T>, session: &SessionState) -> Result<()> {
    if !(session.authenticated && session.current_app == Aid::PICC) {
        return Err(DesfireError::PreconditionNotAuthenticated);
    }
    let (sw, resp) = engine.transceive(FORMAT_PICC)?;
    require_success(sw, resp).map(|_| ())
}

/// `GetFreeMemory` (0x6E): 3-byte little-endian block count.
pub fn get_free_memory<T: ReaderTransport>(engine: &mut Engine<T>) -> Result<u32> {
    let (sw, resp) = engine.transceive(GET_FREE_MEMORY)?;
    let data = require_success(sw, resp)?;
    if data.len() != 3 {
        return Err(DesfireError::Protocol(format!(
            "GetFreeMemory payload length {} != 3",
            data.len()
        )));
    }
    Ok(u32::from_le_bytes([data[0], data[1], data[2], 0]))
}

/// Translate a non-success status into its typed error, otherwise unwrap
/// the payload that accompanied it (also used to reject a lingering
/// continuation the caller never drained).
fn require_success(sw: crate::apdu::StatusWord, data: Vec<u8>) -> Result<Vec<u8>> {
    if sw.is_success() {
        Ok(data)
    } else {
        Err(status_to_error(sw))
    }
}
