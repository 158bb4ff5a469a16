//! ISO 7816-4 command/response APDU codec, fixed to the DESFire native
//! wrapping (CLA=0x90, P1=P2=0x00, DESFire opcode in INS).
//!
//! See spec §4.1. Mirrors the shape of the teacher's `iso7816` module:
//! a status-word type with `is_success`/`data_remaining`, plus builders
//! for each ISO 7816-4 command case.

use std::fmt;

/// DESFire opcode for a continuation ("additional frame") request.
pub const ADDITIONAL_FRAME: u8 = 0xAF;

const CLA_NATIVE: u8 = 0x90;

/// Build a case-1 APDU: no data, no Le.
pub fn build_case1(ins: u8) -> Vec<u8> {
    vec![CLA_NATIVE, ins, 0x00, 0x00]
}

/// Build a case-2 APDU: no data, with Le.
pub fn build_case2(ins: u8, le: u8) -> Vec<u8> {
    vec![CLA_NATIVE, ins, 0x00, 0x00, le]
}

/// Build a case-3 APDU: data, no Le. Panics if `data.len() > 255`.
pub fn build_case3(ins: u8, data: &[u8]) -> Vec<u8> {
    assert!(data.len() <= 0xFF, "Lc must fit in one byte");
    let mut out = Vec::with_capacity(5 + data.len());
    out.extend_from_slice(&[CLA_NATIVE, ins, 0x00, 0x00, data.len() as u8]);
    out.extend_from_slice(data);
    out
}

/// Build a case-4 APDU: data, with Le. Panics if `data.len() > 255`.
pub fn build_case4(ins: u8, data: &[u8], le: u8) -> Vec<u8> {
    assert!(data.len() <= 0xFF, "Lc must fit in one byte");
    let mut out = Vec::with_capacity(6 + data.len());
    out.extend_from_slice(&[CLA_NATIVE, ins, 0x00, 0x00, data.len() as u8]);
    out.extend_from_slice(data);
    out.push(le);
    out
}

/// Build the appropriate case-1/2 command for a DESFire opcode given the
/// engine's current Le preference.
pub fn build_command(ins: u8, prefer_no_le: bool) -> Vec<u8> {
    if prefer_no_le {
        build_case1(ins)
    } else {
        build_case2(ins, 0x00)
    }
}

/// Build the appropriate case-3/4 command carrying `data`.
pub fn build_command_with_data(ins: u8, data: &[u8], prefer_no_le: bool) -> Vec<u8> {
    if prefer_no_le {
        build_case3(ins, data)
    } else {
        build_case4(ins, data, 0x00)
    }
}

/// Classification of a response's trailing status word.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusKind {
    Success,
    Continuation,
    LengthError,
    Other,
}

/// A parsed response status word, carrying the raw SW1/SW2 for
/// diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusWord {
    pub sw1: u8,
    pub sw2: u8,
}

impl StatusWord {
    pub fn new(sw1: u8, sw2: u8) -> Self {
        StatusWord { sw1, sw2 }
    }

    pub fn kind(self) -> StatusKind {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) | (0x91, 0x00) => StatusKind::Success,
            (0x91, 0xAF) => StatusKind::Continuation,
            (0x91, 0x7E) | (0x91, 0xA1) => StatusKind::LengthError,
            _ => StatusKind::Other,
        }
    }

    pub fn is_success(self) -> bool {
        self.kind() == StatusKind::Success
    }

    pub fn is_continuation(self) -> bool {
        self.kind() == StatusKind::Continuation
    }

    pub fn is_length_error(self) -> bool {
        self.kind() == StatusKind::LengthError
    }

    /// `Some(())` when this status indicates more data is available by a
    /// means other than continuation frames (kept for parity with the
    /// teacher's `data_remaining` check on ISO 7816 "bytes still
    /// available" status words; DESFire never returns those, so this is
    /// always `None` here and exists for interface symmetry).
    pub fn data_remaining(self) -> Option<()> {
        None
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Parse a raw response into `(status, data)`. Returns `None` if the
/// response is shorter than two bytes (a hard protocol error per spec
/// §4.1 — the caller maps this to [`crate::error::DesfireError::Protocol`]).
pub fn parse_response(response: &[u8]) -> Option<(StatusWord, &[u8])> {
    if response.len() < 2 {
        return None;
    }
    let split = response.len() - 2;
    let sw = StatusWord::new(response[split], response[split + 1]);
    Some((sw, &response[..split]))
}
