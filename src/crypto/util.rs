//! Rotate, padding, and nonce helpers shared by the authentication state
//! machines (spec §4.2).

use rand::RngCore;
use zeroize::Zeroizing;

/// Left-rotate a buffer by one byte: `rol1([a,b,c]) == [b,c,a]`.
pub fn rol1(buf: &[u8]) -> Vec<u8> {
    rol_n(buf, 1)
}

/// Left-rotate a buffer by `n` bytes (modular index).
pub fn rol_n(buf: &[u8], n: usize) -> Vec<u8> {
    if buf.is_empty() {
        return Vec::new();
    }
    let n = n % buf.len();
    let mut out = Vec::with_capacity(buf.len());
    out.extend_from_slice(&buf[n..]);
    out.extend_from_slice(&buf[..n]);
    out
}

/// Pad `buf` to the next multiple of `block_size` with `0x80` then zeros.
/// No-op if `buf.len()` is already a multiple of `block_size`.
pub fn pad_80(buf: &mut Vec<u8>, block_size: usize) {
    if buf.len() % block_size == 0 {
        return;
    }
    buf.push(0x80);
    while buf.len() % block_size != 0 {
        buf.push(0x00);
    }
}

/// Draw `len` bytes from the platform CSPRNG. Returned wrapped in
/// `Zeroizing` since this is exclusively used for challenge nonces that
/// must not linger in memory past the handshake (spec §4.5.5, §9).
pub fn random_bytes(len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    rand::thread_rng().fill_bytes(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rol1_rotates_by_one_byte() {
        assert_eq!(rol1(&[1, 2, 3]), vec![2, 3, 1]);
    }

    #[test]
    fn repeated_rol1_matches_rol_n() {
        let x = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut rolled = x.to_vec();
        for _ in 0..5 {
            rolled = rol1(&rolled);
        }
        assert_eq!(rolled, rol_n(&x, 5));
    }

    #[test]
    fn rol_n_full_cycle_is_identity() {
        let x = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        assert_eq!(rol_n(&x, x.len()), x.to_vec());
    }

    #[test]
    fn pad_80_pads_short_buffer() {
        let mut buf = vec![1, 2, 3];
        pad_80(&mut buf, 16);
        assert_eq!(buf.len(), 16);
        assert_eq!(buf[3], 0x80);
        assert!(buf[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn pad_80_is_noop_on_aligned_buffer() {
        let mut buf = vec![0u8; 16];
        pad_80(&mut buf, 16);
        assert_eq!(buf.len(), 16);
    }
}
