//! Rolling hash used to verify bulk uploads
//!
//! Both ends hash the uploaded bytes; the client asks the device for its
//! value with `check_hash` and compares. Not cryptographic.

/// Hash a byte sequence
///
/// The empty sequence hashes to `0`.
///
/// # Examples
///
/// ```
/// use zkbio_core::hash::rolling_hash;
///
/// assert_eq!(rolling_hash(b""), 0);
/// assert_eq!(rolling_hash(b"abc"), 0x6783);
/// ```
pub fn rolling_hash(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }

    let mut a: u64 = 0;
    for &x in data {
        a = (a << 4) + u64::from(x);
        let b = a & 0xF000_0000;
        if b != 0 {
            let mut c = b >> 24;
            if c & 0x80 != 0 {
                c |= 0xFFFF_FF00;
            }
            c ^= b;
            a ^= c;
        }
        a &= 0xFFFF_FFFF;
    }

    // a mod 0xFEFFFF, computed by reciprocal multiplication
    let b = (((a * 0x4040_4081) >> 32) >> 22) * 0x00FE_FFFF;
    (a as u32).wrapping_sub(b as u32)
}
