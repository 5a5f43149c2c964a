//! Cache key derivation.
//!
//! A key is the first 128 bits of a SHA-256 digest over the tool namespace
//! and the normalized, ordered arguments. Every field is length-prefixed so
//! `("a|b", "c")` and `("a", "b|c")` hash differently, and an absent optional
//! argument is encoded with a marker no real string can produce. Raw argument
//! text never reaches storage.

use sha2::{Digest, Sha256};
use std::fmt;

/// Hex characters in a derived key (128 bits).
pub const KEY_HEX_LEN: usize = 32;

const ABSENT_MARKER: u64 = u64::MAX;

/// A derived cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One primitive argument contributing to a key.
///
/// Numbers and booleans are coerced to their decimal / `true`/`false` text,
/// so `KeyArg::from(5u32)` and `KeyArg::from("5")` derive the same key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyArg<'a> {
    Text(&'a str),
    Owned(String),
    Absent,
}

impl KeyArg<'_> {
    fn text(&self) -> Option<&str> {
        match self {
            KeyArg::Text(s) => Some(s),
            KeyArg::Owned(s) => Some(s.as_str()),
            KeyArg::Absent => None,
        }
    }
}

impl<'a> From<&'a str> for KeyArg<'a> {
    fn from(value: &'a str) -> Self {
        KeyArg::Text(value)
    }
}

impl<'a> From<&'a String> for KeyArg<'a> {
    fn from(value: &'a String) -> Self {
        KeyArg::Text(value.as_str())
    }
}

impl<'a> From<Option<&'a str>> for KeyArg<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(KeyArg::Absent, KeyArg::Text)
    }
}

macro_rules! key_arg_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for KeyArg<'_> {
                fn from(value: $ty) -> Self {
                    KeyArg::Owned(value.to_string())
                }
            }
        )*
    };
}

key_arg_from_display!(u32, u64, i32, i64, usize, bool);

/// Derive the key for `namespace` and its ordered arguments.
pub fn derive_key(namespace: &str, args: &[KeyArg<'_>]) -> CacheKey {
    let mut hasher = Sha256::new();
    write_field(&mut hasher, Some(namespace));
    hasher.update((args.len() as u64).to_le_bytes());
    for arg in args {
        write_field(&mut hasher, arg.text());
    }
    let digest = hasher.finalize();
    CacheKey(hex::encode(&digest[..KEY_HEX_LEN / 2]))
}

fn write_field(hasher: &mut Sha256, field: Option<&str>) {
    match field {
        Some(text) => {
            hasher.update((text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        }
        None => hasher.update(ABSENT_MARKER.to_le_bytes()),
    }
}
