//! Crypto primitives (spec §4.2): AES-128 ECB/CBC, 2TDEA/3TDEA-CBC,
//! AES-CMAC with subkey derivation, CRC16/CRC32, rotate-left, padding.
//!
//! Every primitive here operates on byte buffers with no implicit
//! padding; callers apply [`util::pad_80`] explicitly where the protocol
//! calls for it.

pub mod aes;
pub mod cmac;
pub mod crc;
pub mod des;
pub mod util;
