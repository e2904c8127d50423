// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-size string identifiers.
//!
//! Every domain id is a 4-character type prefix followed by a 19-character
//! nanoid body, stored inline in a 23-byte buffer so ids never allocate.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

pub const ID_MAX_LEN: usize = 23;
const NANOID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Inline fixed-capacity buffer holding an id's bytes.
#[derive(Clone, Copy)]
pub struct IdBuf {
    buf: [u8; ID_MAX_LEN],
    len: u8,
}

impl IdBuf {
    pub fn from_str(s: &str) -> Self {
        debug_assert!(
            s.len() <= ID_MAX_LEN,
            "id exceeds {} bytes ({} bytes): {:?}",
            ID_MAX_LEN,
            s.len(),
            s,
        );
        let len = s.len().min(ID_MAX_LEN);
        let mut buf = [0u8; ID_MAX_LEN];
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self {
            buf,
            len: len as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only ever constructed from &str, so always valid UTF-8.
        match std::str::from_utf8(&self.buf[..self.len as usize]) {
            Ok(s) => s,
            Err(_) => unreachable!("IdBuf constructed from non-UTF-8"),
        }
    }
}

impl fmt::Debug for IdBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for IdBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for IdBuf {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}
impl Eq for IdBuf {}

impl Hash for IdBuf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl Borrow<str> for IdBuf {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

/// Generate a random nanoid-style body of `len` characters.
fn random_suffix(len: usize) -> String {
    nanoid::nanoid!(len, &NANOID_ALPHABET)
}

/// Defines a newtype wrapper around [`IdBuf`] with a fixed 4-character prefix.
///
/// Generates `new()` (random), `from_string(impl Into<String>)`, `as_str()`,
/// `suffix()`, `short(n)`, `Display`, `From<&str>`/`From<String>`,
/// `PartialEq<str>`/`PartialEq<&str>`, `Deref<Target = str>`, and transparent
/// serde support.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $vis:vis struct $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        $vis struct $name($crate::id::IdBuf);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new() -> Self {
                let suffix = $crate::id::__random_suffix(19);
                Self::from_string(format!("{}{}", $prefix, suffix))
            }

            pub fn from_string(s: impl Into<String>) -> Self {
                Self($crate::id::IdBuf::from_str(&s.into()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            pub fn suffix(&self) -> &str {
                self.as_str().get($prefix.len()..).unwrap_or("")
            }

            pub fn short(&self, n: usize) -> &str {
                let s = self.suffix();
                &s[..n.min(s.len())]
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.as_str())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                self.as_str()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.as_str() == *other
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from_string(s))
            }
        }
    };
}

#[doc(hidden)]
pub fn __random_suffix(len: usize) -> String {
    random_suffix(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    define_id! { pub struct TestId, "test" }

    #[test]
    fn new_has_prefix() {
        let id = TestId::new();
        assert!(id.as_str().starts_with("test"));
        assert_eq!(id.as_str().len(), ID_MAX_LEN);
    }

    #[test]
    fn round_trips_through_string() {
        let id = TestId::new();
        let back = TestId::from_string(id.as_str().to_string());
        assert_eq!(id, back);
    }

    #[test]
    fn suffix_excludes_prefix() {
        let id = TestId::from_string("test1234567890123456789");
        assert_eq!(id.suffix(), "1234567890123456789");
    }

    #[test]
    fn short_truncates_suffix() {
        let id = TestId::from_string("test1234567890123456789");
        assert_eq!(id.short(4), "1234");
    }

    #[test]
    fn serde_round_trip() {
        let id = TestId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: TestId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn distinct_calls_are_unique() {
        let a = TestId::new();
        let b = TestId::new();
        assert_ne!(a, b);
    }
}
