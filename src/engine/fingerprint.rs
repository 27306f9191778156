//! Change fingerprint.
//!
//! A deterministic hash over the three numeric fields at fixed 4-decimal
//! precision. Two quotes with the same fingerprint are "no real change"
//! even when trailing raw fields differ. Dedup only: collisions are
//! harmless, so a cheap 32-bit string hash is enough.

/// Fingerprint of (price, change, percent), rendered in base 36.
pub fn fingerprint(price: f64, change: f64, percent: f64) -> String {
    let s = format!("{price:.4}_{change:.4}_{percent:.4}");

    let mut hash: i32 = 0;
    for b in s.bytes() {
        // hash * 31 + byte, wrapping at 32 bits
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(b as i32);
    }

    to_base36(hash)
}

fn to_base36(v: i32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if v == 0 {
        return "0".to_string();
    }

    let negative = v < 0;
    let mut n = (v as i64).unsigned_abs();

    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize] as char);
        n /= 36;
    }
    if negative {
        buf.push('-');
    }

    buf.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_for_identical_input() {
        let a = fingerprint(3266.72, 71.84, 2.25);
        let b = fingerprint(3266.72, 71.84, 2.25);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn differs_within_four_decimals() {
        assert_ne!(
            fingerprint(100.0, 1.0, 1.0),
            fingerprint(100.0001, 1.0, 1.0)
        );
        assert_ne!(fingerprint(100.0, 1.0, 1.0), fingerprint(100.0, 1.0, 1.01));
    }

    #[test]
    fn ignores_sub_precision_noise() {
        // Differences past the 4th decimal round away.
        assert_eq!(
            fingerprint(100.00001, 1.0, 1.0),
            fingerprint(100.00002, 1.0, 1.0)
        );
    }

    #[test]
    fn field_order_matters() {
        assert_ne!(fingerprint(1.0, 2.0, 3.0), fingerprint(3.0, 2.0, 1.0));
    }

    #[test]
    fn base36_handles_negative_hashes() {
        // Pick inputs whose 32-bit hash goes negative; the rendering must
        // stay deterministic rather than panic.
        let s = fingerprint(987654.3210, -123.4567, -9.9999);
        assert!(s.chars().all(|c| c == '-' || c.is_ascii_alphanumeric()));
    }
}
