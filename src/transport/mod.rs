//! Reader transport contract (spec §4.3, §6) and PN532 escape framing.
//!
//! The core only requires `transmit`; `escape`/`ensure_iso_dep` are
//! optional fallbacks used by the transmit engine when a reader (e.g. an
//! ACR122U/PN532-class device) needs its APDUs wrapped. Generalizes the
//! teacher's concrete `Nfc` struct into a trait so an external PC/SC
//! driver can implement it without the core depending on a particular
//! reader stack.

use crate::error::{DesfireError, Result};

#[cfg(feature = "proxmark3")]
pub mod proxmark3;

/// PN532 `InDataExchange` escape wrapper prefix (`D4 40 01`).
pub const PN532_IN_DATA_EXCHANGE: [u8; 3] = [0xD4, 0x40, 0x01];

/// PN532 `InCommunicateThru` escape wrapper prefix (`D4 42`).
pub const PN532_IN_COMMUNICATE_THRU: [u8; 2] = [0xD4, 0x42];

/// One-shot RATS frame used by [`ReaderTransport::ensure_iso_dep`]
/// implementations that need to force ISO-DEP activation.
pub const PN532_RATS: [u8; 2] = [0xE0, 0x50];

/// Wrap `apdu` in a CCID-style escape frame: `FF 00 00 00 Lc payload`.
fn ccid_escape_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0x00, 0x00, 0x00, payload.len() as u8];
    out.extend_from_slice(payload);
    out
}

/// Build the raw-passthrough escape frame for `apdu`.
pub fn escape_raw(apdu: &[u8]) -> Vec<u8> {
    ccid_escape_frame(apdu)
}

/// Build the PN532 `InDataExchange` escape frame for `apdu`.
pub fn escape_in_data_exchange(apdu: &[u8]) -> Vec<u8> {
    let mut payload = PN532_IN_DATA_EXCHANGE.to_vec();
    payload.extend_from_slice(apdu);
    ccid_escape_frame(&payload)
}

/// Build the PN532 `InCommunicateThru` escape frame for `apdu`.
pub fn escape_in_communicate_thru(apdu: &[u8]) -> Vec<u8> {
    let mut payload = PN532_IN_COMMUNICATE_THRU.to_vec();
    payload.extend_from_slice(apdu);
    ccid_escape_frame(&payload)
}

/// Parse a PN532 escape response (`D5 41 <status> ...` or
/// `D5 43 <status> ...`) and return the trailing APDU bytes.
pub fn parse_pn532_response(response: &[u8]) -> Option<&[u8]> {
    if response.len() < 3 || response[0] != 0xD5 {
        return None;
    }
    match response[1] {
        0x41 | 0x43 => Some(&response[3..]),
        _ => None,
    }
}

/// Reader transport contract consumed by the engine (spec §4.3, §6).
///
/// Implementations are owned exclusively by one session (spec §5): the
/// engine never shares a transport across concurrent sessions.
pub trait ReaderTransport {
    /// Send `command` to the card and return the raw response bytes
    /// (data `‖` SW1 `‖` SW2). Transport-level failures (timeouts, I/O
    /// errors) are reported as `Err`.
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>>;

    /// Raw CCID escape channel, used to wrap APDUs for readers that
    /// can't pass ISO 7816-4 frames through directly. `None` means the
    /// reader doesn't support it.
    fn escape(&mut self, _command: &[u8]) -> Result<Vec<u8>> {
        Err(DesfireError::Transport("escape channel not supported".into()))
    }

    /// Whether [`escape`](Self::escape) is available on this transport.
    fn supports_escape(&self) -> bool {
        false
    }

    /// Force ISO-DEP (ISO 14443-4) activation, e.g. via a one-shot RATS.
    /// A no-op for transports that activate ISO-DEP during anti-collision.
    fn ensure_iso_dep(&mut self) -> Result<()> {
        Ok(())
    }

    /// Identity hint used to select reader-specific quirks (spec §4.3,
    /// §9 "reader quirks as data").
    fn identity_hint(&self) -> &str {
        "generic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_raw_builds_ccid_frame() {
        let apdu = [0x90, 0x60, 0x00, 0x00];
        let frame = escape_raw(&apdu);
        assert_eq!(frame, vec![0xFF, 0x00, 0x00, 0x00, 0x04, 0x90, 0x60, 0x00, 0x00]);
    }

    #[test]
    fn escape_in_data_exchange_wraps_with_prefix() {
        let apdu = [0x90, 0x60, 0x00, 0x00];
        let frame = escape_in_data_exchange(&apdu);
        assert_eq!(
            frame,
            vec![0xFF, 0x00, 0x00, 0x00, 0x07, 0xD4, 0x40, 0x01, 0x90, 0x60, 0x00, 0x00]
        );
    }

    #[test]
    fn parse_pn532_response_strips_header() {
        let resp = [0xD5, 0x41, 0x00, 0x90, 0x00];
        assert_eq!(parse_pn532_response(&resp), Some(&[0x90, 0x00][..]));
    }

    #[test]
    fn parse_pn532_response_rejects_unknown_code() {
        assert_eq!(parse_pn532_response(&[0xD5, 0x7F, 0x00]), None);
    }
}
