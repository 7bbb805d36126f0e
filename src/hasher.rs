use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::{Digest, Md5};

/// Number of characters kept from the encoded digest.
pub const KEY_LENGTH: usize = 8;

/// Derive the short key for `url`.
///
/// The MD5 digest of the URL bytes is base64 encoded with the standard
/// alphabet, every `/` is dropped so the key is usable as a single path
/// segment, and the first [`KEY_LENGTH`] characters are kept.
///
/// The same URL always maps to the same key. Distinct URLs can collide; the
/// storage layer accepts that and the last write wins.
pub fn short_key(url: &str) -> String {
    let digest = Md5::digest(url.as_bytes());
    STANDARD
        .encode(digest)
        .chars()
        .filter(|&c| c != '/')
        .take(KEY_LENGTH)
        .collect()
}
