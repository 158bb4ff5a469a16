//! Key vault contract (spec §6 "Vault contract").
//!
//! The vault's on-disk format, its AES-256-GCM-with-password-derived-key
//! encryption, and its versioning are external concerns (spec §1
//! Out-of-scope); the core only consumes this trait.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;
use crate::types::{Aid, KeyNo, KeyType};

/// A key handed to the core by the vault. Zeroized on drop so a session
/// that borrows one doesn't leave key material lying around after use.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    pub bytes: Vec<u8>,
    #[zeroize(skip)]
    pub key_type: KeyType,
}

/// External key storage, consumed by the core but never implemented by
/// it (spec §1, §6).
pub trait KeyVault {
    /// Fetch the key material and cipher family for `(app_id, key_no)`.
    fn get_key(&self, app_id: Aid, key_no: KeyNo) -> Result<VaultKey>;
}
