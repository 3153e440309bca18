//! Login key derivation
//!
//! When a terminal has a communication key set, the client proves it knows
//! the key by sending a scrambled form of it mixed with the session key.
//! The scramble is reversible by the device; it is obfuscation, not
//! cryptography.

use bytes::Bytes;
use rand::Rng;

/// Create the `login` payload from the comm key and session key
///
/// # Algorithm
///
/// 1. Reverse the 32 bits of the comm key
/// 2. Add the session key (wrapping)
/// 3. XOR bytes 1..4 with `'K'`, `'S'`, `'O'`
/// 4. Emit bytes `[2, 3, mask, 1]`, each XORed with `mask` except the mask itself
///
/// # Examples
///
/// ```
/// use zkbio_core::auth;
///
/// let key = auth::make_commkey(1, 0, 1);
/// assert_eq!(key.as_ref(), &[0x52, 0xCE, 0x01, 0x4A]);
/// ```
pub fn make_commkey(comm_key: u32, session_key: u16, mask: u8) -> Bytes {
    let k = comm_key.reverse_bits().wrapping_add(u32::from(session_key));
    let bytes = k.to_le_bytes();

    let b1 = bytes[1] ^ b'K';
    let b2 = bytes[2] ^ b'S';
    let b3 = bytes[3] ^ b'O';

    Bytes::copy_from_slice(&[b2 ^ mask, b3 ^ mask, mask, b1 ^ mask])
}

/// Draw a fresh mask byte for [`make_commkey`]
pub fn draw_mask() -> u8 {
    rand::thread_rng().gen_range(1..=u8::MAX)
}
