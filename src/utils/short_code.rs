//! Deterministic short code derivation.
//!
//! A short code is the base-62 rendering of a SHA-256 digest, truncated to a
//! fixed length. The same input always yields the same code.

use sha2::{Digest, Sha256};

/// The 62-symbol alphabet: digits, lowercase, uppercase.
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Default short code length.
pub const DEFAULT_CODE_LENGTH: usize = 8;

/// Longest code the encoding can produce.
///
/// The hex digest is folded into a 64-bit accumulator, and `u64::MAX` in
/// base 62 is 11 symbols long.
pub const MAX_CODE_LENGTH: usize = 11;

/// Derives a short code of `length` characters from `input`.
///
/// # Panics
///
/// Never panics for `length` in `1..=MAX_CODE_LENGTH`; callers validate the
/// length once at configuration time.
///
/// # Examples
///
/// ```
/// use urlshrink::utils::short_code::hash_to_short;
///
/// assert_eq!(hash_to_short("https://practicum.yandex.ru/", 8), "5Ol0CyIn");
/// ```
pub fn hash_to_short(input: &str, length: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let encoded = base16_to_base62(&hex::encode(digest));

    let mut code = String::with_capacity(length);
    // Rare short encodings are left-padded so every code has the same length.
    for _ in encoded.len()..length {
        code.push(ALPHABET[0] as char);
    }
    code.push_str(&encoded[..length.min(encoded.len())]);
    code
}

/// Derives the fallback code for the `attempt`-th collision on `input`.
///
/// The attempt number is appended to the input before hashing.
pub fn hash_to_short_with_attempt(input: &str, attempt: u32, length: usize) -> String {
    hash_to_short(&format!("{input}{attempt}"), length)
}

/// Returns true if `code` has the given length and only uses [`ALPHABET`] symbols.
pub fn is_valid_code(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Re-encodes a lowercase hex string as base 62, most significant digit first.
///
/// Digits accumulate into a `u64` with wrapping arithmetic, so only the low
/// 64 bits of the value survive. Zero encodes to an empty string.
fn base16_to_base62(hex: &str) -> String {
    let mut value: u64 = 0;
    for c in hex.chars() {
        if let Some(digit) = c.to_digit(16) {
            value = value.wrapping_mul(16).wrapping_add(u64::from(digit));
        }
    }

    let mut digits = Vec::with_capacity(MAX_CODE_LENGTH);
    while value > 0 {
        digits.push(ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    digits.reverse();

    // Every byte comes from ALPHABET, which is ASCII.
    digits.into_iter().map(char::from).collect()
}
