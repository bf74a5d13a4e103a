//! Key validation.

/// Punctuation accepted in keys besides letters and digits.
pub const KEY_PUNCTUATION: [char; 7] = [':', '@', '#', '+', '-', '_', '/'];

/// Returns true if `key` is non-empty and made only of Unicode letters,
/// Unicode digits and [`KEY_PUNCTUATION`].
pub fn key_valid(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphabetic() || c.is_numeric() || KEY_PUNCTUATION.contains(&c))
}
