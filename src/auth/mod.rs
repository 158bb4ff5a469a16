//! Authentication state machines (spec §4.5): a tagged variant over the
//! four handshakes, dispatched by pattern match rather than inheritance
//! (spec §9 "Polymorphism").

pub mod aes;
pub mod ev2;
pub mod legacy;

use crate::engine::Engine;
use crate::error::Result;
use crate::session::SessionState;
use crate::transport::ReaderTransport;
use crate::types::KeyNo;

/// One authentication attempt, tagged by handshake kind.
pub enum AuthRequest {
    LegacyDes { key_no: KeyNo, key: Vec<u8> },
    Aes { key_no: KeyNo, key: [u8; 16] },
    Ev2First { key_no: KeyNo, key: [u8; 16] },
    Ev2NonFirst { key_no: KeyNo, key: [u8; 16] },
}

/// Run `request` against `engine`, updating `session` on success and
/// clearing all session material on any failure (spec §4.5.5, §7
/// "On any error inside an authentication handshake, the session state is
/// cleared before the error propagates").
pub fn authenticate<T: ReaderTransport>(
    engine: &mut Engine<T>,
    session: &mut SessionState,
    request: AuthRequest,
) -> Result<()> {
    let outcome = match request {
        AuthRequest::LegacyDes { key_no, key } => legacy::authenticate(engine, key_no, &key)
            .map(|o| session.adopt_legacy_des(o.key_no)),
        AuthRequest::Aes { key_no, key } => {
            aes::authenticate(engine, key_no, &key).map(|o| session.adopt_aes(o.key_no, o.keys))
        }
        AuthRequest::Ev2First { key_no, key } => ev2::authenticate_first(engine, key_no, &key)
            .map(|o| session.adopt_ev2_first(o.key_no, o.keys, o.ti)),
        AuthRequest::Ev2NonFirst { key_no, key } => {
            if session.transaction_id.is_none() {
                return Err(crate::error::DesfireError::PreconditionNotAuthenticated);
            }
            ev2::authenticate_non_first(engine, key_no, &key)
                .map(|o| session.adopt_ev2_non_first(o.key_no, o.keys))
        }
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(e) => {
            session.clear_auth();
            Err(e)
        }
    }
}
