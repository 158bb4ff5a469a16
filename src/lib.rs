//! Host-side protocol engine for MIFARE DESFire EV1/EV2/EV3 cards over
//! ISO 7816-4 / ISO 14443-4.
//!
//! [`DesfireCard`] ties the transmit engine, session state, and the
//! authentication/key-change/file-operation layers together behind one
//! facade generic over [`transport::ReaderTransport`]. The reader driver,
//! key vault, and anything above application/file operations are
//! external collaborators (see SPEC_FULL.md §1).

pub mod apdu;
pub mod auth;
pub mod card;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod keychange;
pub mod session;
pub mod transport;
pub mod types;
pub mod vault;

pub use error::{DesfireError, Result};
pub use session::SessionState;
pub use types::{Aid, KeyType};

use auth::AuthRequest;
use card::{DataFileKind, KeySettings};
use engine::{Engine, EngineConfig};
use transport::ReaderTransport;
use types::{AccessRights, FileNo, KeyNo, ValueFileParams};

/// Top-level facade over one card session (spec §2 "Data flow",
/// §5 "the reader transport is exclusively owned by the session").
pub struct DesfireCard<T: ReaderTransport> {
    engine: Engine<T>,
    session: SessionState,
}

impl<T: ReaderTransport> DesfireCard<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    pub fn with_config(transport: T, config: EngineConfig) -> Self {
        DesfireCard {
            engine: Engine::with_config(transport, config),
            session: SessionState::new(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn transport(&self) -> &T {
        self.engine.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.engine.transport_mut()
    }

    // -- Authentication (spec §4.5) ---------------------------------------

    pub fn authenticate_legacy_des(&mut self, key_no: KeyNo, key: Vec<u8>) -> Result<()> {
        auth::authenticate(
            &mut self.engine,
            &mut self.session,
            AuthRequest::LegacyDes { key_no, key },
        )
    }

    pub fn authenticate_aes(&mut self, key_no: KeyNo, key: [u8; 16]) -> Result<()> {
        auth::authenticate(
            &mut self.engine,
            &mut self.session,
            AuthRequest::Aes { key_no, key },
        )
    }

    pub fn authenticate_ev2_first(&mut self, key_no: KeyNo, key: [u8; 16]) -> Result<()> {
        auth::authenticate(
            &mut self.engine,
            &mut self.session,
            AuthRequest::Ev2First { key_no, key },
        )
    }

    pub fn authenticate_ev2_non_first(&mut self, key_no: KeyNo, key: [u8; 16]) -> Result<()> {
        auth::authenticate(
            &mut self.engine,
            &mut self.session,
            AuthRequest::Ev2NonFirst { key_no, key },
        )
    }

    /// Clear authentication without reselecting an application (spec §4.5.5
    /// `Authenticated --ResetAuth--> Selected(AID)`).
    pub fn reset_auth(&mut self) {
        self.session.clear_auth();
    }

    /// Full explicit teardown (spec §3 "Lifecycles ... destroyed by any of
    /// `reset`, failed authentication, SelectApplication, or explicit
    /// teardown"): clears session key material and forgets the engine's
    /// learned Le-preference.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.session.clear_auth();
    }

    // -- Secure key change & key-set rollover (spec §4.6) -----------------

    pub fn change_key_ev2(
        &mut self,
        key_no: KeyNo,
        new_key: &[u8; 16],
        new_key_version: u8,
    ) -> Result<()> {
        keychange::change_key_ev2(&mut self.engine, &self.session, key_no, new_key, new_key_version)
    }

    pub fn change_key_legacy(
        &mut self,
        key_no: KeyNo,
        new_key: &[u8],
        new_key_version: u8,
    ) -> Result<()> {
        keychange::change_key_legacy(&mut self.engine, key_no, new_key, new_key_version)
    }

    pub fn initialize_key_set(&mut self, key_set_no: u8, key_type: u8) -> Result<()> {
        keychange::initialize_key_set(&mut self.engine, &self.session, key_set_no, key_type)
    }

    pub fn roll_key_set(&mut self, key_set_no: u8) -> Result<()> {
        keychange::roll_key_set(&mut self.engine, &self.session, key_set_no)
    }

    pub fn finalize_key_set(&mut self) -> Result<()> {
        keychange::finalize_key_set(&mut self.engine, &self.session)
    }

    // -- Application & file operations (spec §4.7) ------------------------

    pub fn get_version(&mut self) -> Result<Vec<u8>> {
        card::get_version(&mut self.engine)
    }

    pub fn get_application_ids(&mut self) -> Result<Vec<Aid>> {
        card::get_application_ids(&mut self.engine)
    }

    pub fn create_application(
        &mut self,
        aid: Aid,
        key_settings: u8,
        num_keys: u8,
        key_type: KeyType,
    ) -> Result<()> {
        card::create_application(&mut self.engine, aid, key_settings, num_keys, key_type)
    }

    pub fn select_application(&mut self, aid: Aid) -> Result<()> {
        card::select_application(&mut self.engine, &mut self.session, aid)
    }

    pub fn create_data_file(
        &mut self,
        kind: DataFileKind,
        file_no: FileNo,
        comm_settings: u8,
        access_rights: AccessRights,
        file_size: u32,
    ) -> Result<()> {
        card::create_data_file(&mut self.engine, kind, file_no, comm_settings, access_rights, file_size)
    }

    pub fn create_value_file(
        &mut self,
        file_no: FileNo,
        comm_settings: u8,
        access_rights: AccessRights,
        params: ValueFileParams,
    ) -> Result<()> {
        card::create_value_file(&mut self.engine, file_no, comm_settings, access_rights, params)
    }

    pub fn read_data(&mut self, file_no: FileNo, offset: u32, length: u32) -> Result<Vec<u8>> {
        card::read_data(&mut self.engine, file_no, offset, length)
    }

    pub fn write_data(&mut self, file_no: FileNo, offset: u32, payload: &[u8]) -> Result<()> {
        card::write_data(&mut self.engine, file_no, offset, payload)
    }

    pub fn get_value(&mut self, file_no: FileNo) -> Result<i32> {
        card::get_value(&mut self.engine, file_no)
    }

    pub fn credit(&mut self, file_no: FileNo, amount: i32) -> Result<()> {
        card::credit(&mut self.engine, file_no, amount)
    }

    pub fn debit(&mut self, file_no: FileNo, amount: i32) -> Result<()> {
        card::debit(&mut self.engine, file_no, amount)
    }

    pub fn limited_credit(&mut self, file_no: FileNo, amount: i32) -> Result<()> {
        card::limited_credit(&mut self.engine, file_no, amount)
    }

    pub fn commit_transaction(&mut self) -> Result<()> {
        card::commit_transaction(&mut self.engine)
    }

    pub fn abort_transaction(&mut self) -> Result<()> {
        card::abort_transaction(&mut self.engine)
    }

    pub fn get_key_settings(&mut self) -> Result<KeySettings> {
        card::get_key_settings(&mut self.engine)
    }

    pub fn format_picc(&mut self) -> Result<()> {
        card::format_picc(&mut self.engine, &self.session)
    }

    pub fn get_free_memory(&mut self) -> Result<u32> {
        card::get_free_memory(&mut self.engine)
    }
}
