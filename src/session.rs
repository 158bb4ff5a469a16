//! Session state lifecycle (spec §3, §4.6).
//!
//! A single owned record, mutated only by the engine — callers never hold
//! a reference to it across commands (spec §9 "shared mutable state").

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::{Aid, KeyNo};

/// Which handshake produced the current session, if any.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthKind {
    LegacyDes,
    Aes,
    Ev2First,
    Ev2NonFirst,
}

/// Session key material, zeroized on drop and on any reset.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    pub enc_key: [u8; 16],
    pub mac_key: [u8; 16],
}

impl Default for SessionKeys {
    fn default() -> Self {
        SessionKeys {
            enc_key: [0u8; 16],
            mac_key: [0u8; 16],
        }
    }
}

/// The engine's sole mutable session record (spec §3 "Session state").
#[derive(Clone, Default)]
pub struct SessionState {
    pub authenticated: bool,
    pub auth_kind: Option<AuthKind>,
    pub key_no: KeyNo,
    pub keys: SessionKeys,
    pub transaction_id: Option<[u8; 4]>,
    pub command_counter: u16,
    pub current_app: Aid,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all authentication material without touching `current_app`.
    /// Used by a failed `authenticate*` and by `ResetAuth`.
    pub fn clear_auth(&mut self) {
        self.authenticated = false;
        self.auth_kind = None;
        self.key_no = 0;
        self.keys = SessionKeys::default();
        self.transaction_id = None;
        self.command_counter = 0;
    }

    /// Clear authentication and move to a newly selected application, as a
    /// fresh `SelectApplication` does unconditionally before any auth
    /// attempt (spec §3 invariant).
    pub fn select_application(&mut self, aid: Aid) {
        self.clear_auth();
        self.current_app = aid;
    }

    pub fn adopt_ev2_first(&mut self, key_no: KeyNo, keys: SessionKeys, ti: [u8; 4]) {
        self.authenticated = true;
        self.auth_kind = Some(AuthKind::Ev2First);
        self.key_no = key_no;
        self.keys = keys;
        self.transaction_id = Some(ti);
        self.command_counter = 0;
    }

    pub fn adopt_ev2_non_first(&mut self, key_no: KeyNo, keys: SessionKeys) {
        self.authenticated = true;
        self.auth_kind = Some(AuthKind::Ev2NonFirst);
        self.key_no = key_no;
        self.keys = keys;
        self.command_counter = 0;
        // transaction_id is left untouched: EV2NonFirst reuses the TI
        // established by a prior EV2First in the same application.
    }

    pub fn adopt_aes(&mut self, key_no: KeyNo, keys: SessionKeys) {
        self.authenticated = true;
        self.auth_kind = Some(AuthKind::Aes);
        self.key_no = key_no;
        self.keys = keys;
        self.transaction_id = None;
        self.command_counter = 0;
    }

    pub fn adopt_legacy_des(&mut self, key_no: KeyNo) {
        self.authenticated = true;
        self.auth_kind = Some(AuthKind::LegacyDes);
        self.key_no = key_no;
        self.keys = SessionKeys::default();
        self.transaction_id = None;
        self.command_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_application_clears_auth() {
        let mut s = SessionState::new();
        s.adopt_aes(3, SessionKeys { enc_key: [1; 16], mac_key: [2; 16] });
        assert!(s.authenticated);
        s.select_application(Aid(0x010203));
        assert!(!s.authenticated);
        assert_eq!(s.current_app, Aid(0x010203));
        assert_eq!(s.keys.enc_key, [0u8; 16]);
    }

    #[test]
    fn ev2_first_sets_ti_and_resets_counter() {
        let mut s = SessionState::new();
        s.command_counter = 42;
        s.adopt_ev2_first(
            1,
            SessionKeys { enc_key: [9; 16], mac_key: [8; 16] },
            [0xAA, 0xBB, 0xCC, 0xDD],
        );
        assert_eq!(s.transaction_id, Some([0xAA, 0xBB, 0xCC, 0xDD]));
        assert_eq!(s.command_counter, 0);
        assert!(s.authenticated);
    }

    #[test]
    fn ev2_non_first_preserves_existing_ti() {
        let mut s = SessionState::new();
        s.transaction_id = Some([1, 2, 3, 4]);
        s.adopt_ev2_non_first(2, SessionKeys { enc_key: [5; 16], mac_key: [6; 16] });
        assert_eq!(s.transaction_id, Some([1, 2, 3, 4]));
        assert!(s.authenticated);
    }
}
