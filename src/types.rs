//! Data model shared by the protocol engine and the application layer.
//!
//! See spec §3. All multi-byte integers here are little-endian on the
//! wire, matching the DESFire native framing.

/// 24-bit application identifier. `0x00_00_00` is the PICC (card-level)
/// context.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Aid(pub u32);

impl Aid {
    pub const PICC: Aid = Aid(0x000000);

    pub fn to_le_bytes(self) -> [u8; 3] {
        let b = self.0.to_le_bytes();
        [b[0], b[1], b[2]]
    }

    pub fn from_le_bytes(bytes: [u8; 3]) -> Self {
        Aid(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]))
    }
}

impl Default for Aid {
    fn default() -> Self {
        Aid::PICC
    }
}

/// File number, 0..31.
pub type FileNo = u8;

/// A key number within an application or the PICC, 0..13 for a real key
/// plus the sentinel nibble values used in [`AccessRights`].
pub type KeyNo = u8;

pub const KEY_FREE: u8 = 0xE;
pub const KEY_DENIED: u8 = 0xF;

/// Packed access rights: byte0 = Read<<4 | Write, byte1 = ReadWrite<<4 | ChangeAccessRights.
///
/// Each nibble is a key number 0..13, `0xE` (free) or `0xF` (denied).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AccessRights {
    pub read: u8,
    pub write: u8,
    pub read_write: u8,
    pub change_access_rights: u8,
}

impl AccessRights {
    pub fn pack(self) -> [u8; 2] {
        [
            (self.read << 4) | (self.write & 0x0F),
            (self.read_write << 4) | (self.change_access_rights & 0x0F),
        ]
    }

    pub fn unpack(bytes: [u8; 2]) -> Self {
        AccessRights {
            read: bytes[0] >> 4,
            write: bytes[0] & 0x0F,
            read_write: bytes[1] >> 4,
            change_access_rights: bytes[1] & 0x0F,
        }
    }
}

/// Key cipher family, as reported by `GetKeySettings`/`CreateApplication`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyType {
    Des,
    TripleDes,
    Aes,
}

/// Value-file creation parameters (spec §3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ValueFileParams {
    pub lower_limit: i32,
    pub upper_limit: i32,
    pub initial_value: i32,
    pub limited_credit_enabled: bool,
}

impl ValueFileParams {
    pub fn to_bytes(self) -> [u8; 13] {
        let mut out = [0u8; 13];
        out[0..4].copy_from_slice(&self.lower_limit.to_le_bytes());
        out[4..8].copy_from_slice(&self.upper_limit.to_le_bytes());
        out[8..12].copy_from_slice(&self.initial_value.to_le_bytes());
        out[12] = self.limited_credit_enabled as u8;
        out
    }
}

/// Fixed 24-byte transaction record committed alongside value operations.
///
/// Layout: `{ type: u8, amount: i32, timestamp: u64, balance_after: i32,
/// reserved: [u8; 7] }`, all little-endian.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransactionRecord {
    pub kind: u8,
    pub amount: i32,
    pub timestamp: u64,
    pub balance_after: i32,
    pub reserved: [u8; 7],
}

impl TransactionRecord {
    pub const LEN: usize = 24;

    pub fn to_bytes(self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0] = self.kind;
        out[1..5].copy_from_slice(&self.amount.to_le_bytes());
        out[5..13].copy_from_slice(&self.timestamp.to_le_bytes());
        out[13..17].copy_from_slice(&self.balance_after.to_le_bytes());
        out[17..24].copy_from_slice(&self.reserved);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN {
            return None;
        }
        Some(TransactionRecord {
            kind: bytes[0],
            amount: i32::from_le_bytes(bytes[1..5].try_into().unwrap()),
            timestamp: u64::from_le_bytes(bytes[5..13].try_into().unwrap()),
            balance_after: i32::from_le_bytes(bytes[13..17].try_into().unwrap()),
            reserved: bytes[17..24].try_into().unwrap(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aid_round_trip() {
        let aid = Aid(0x123456);
        assert_eq!(aid.to_le_bytes(), [0x56, 0x34, 0x12]);
        assert_eq!(Aid::from_le_bytes([0x56, 0x34, 0x12]), aid);
    }

    #[test]
    fn access_rights_packing() {
        let ar = AccessRights {
            read: 0x1,
            write: 0x2,
            read_write: 0x3,
            change_access_rights: 0x4,
        };
        assert_eq!(ar.pack(), [0x12, 0x34]);
        assert_eq!(AccessRights::unpack([0x12, 0x34]), ar);
    }

    #[test]
    fn transaction_record_round_trip() {
        let rec = TransactionRecord {
            kind: 1,
            amount: 100,
            timestamp: 0x0102030405060708,
            balance_after: 200,
            reserved: [0; 7],
        };
        let bytes = rec.to_bytes();
        assert_eq!(bytes.len(), 24);
        assert_eq!(TransactionRecord::from_bytes(&bytes), Some(rec));
    }
}
