// Copyright 2026 The Muse Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Content-addressed identifier helpers shared by objects, snapshots and
//! commits (spec §3, §4.9).
//!
//! Grounded on `jj-lib`'s `object_id.rs`: the `id_type!` macro, the
//! [`ObjectId`] trait and [`HexPrefix`]/[`PrefixResolution`] are carried over
//! near-verbatim, generalized to this crate's single hash width (SHA-256,
//! 64 hex chars for every id kind) instead of jj's per-kind lengths, and with
//! the "reverse hex" `ChangeId` encoding dropped (spec has no change-id
//! concept distinct from the commit id).

use std::fmt;

pub trait ObjectId {
    fn object_type(&self) -> &'static str;
    fn as_bytes(&self) -> &[u8];
    fn hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

/// Defines a newtype wrapping a `Vec<u8>` hash digest, with hex
/// encode/decode, `Display`, `Debug`, ordering and [`ObjectId`] for free.
macro_rules! id_type {
    ($(#[$attr:meta])* $vis:vis $name:ident) => {
        $(#[$attr])*
        #[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, serde::Serialize, serde::Deserialize)]
        $vis struct $name(#[serde(with = "hex::serde")] Vec<u8>);

        impl $name {
            pub fn new(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }

            pub fn from_hex(hex_str: &str) -> Option<Self> {
                hex::decode(hex_str).ok().map(Self)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.hex()).finish()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.hex())
            }
        }

        impl crate::object_id::ObjectId for $name {
            fn object_type(&self) -> &'static str {
                stringify!($name)
            }

            fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

pub(crate) use id_type;

id_type!(
    /// SHA-256 id of a content-addressed blob (spec §3's "Object").
    pub ObjectHash
);
id_type!(
    /// SHA-256 id of an immutable path→object_id manifest (spec §3's
    /// "Snapshot").
    pub SnapshotId
);
id_type!(
    /// SHA-256 id of a DAG node (spec §3's "Commit").
    pub CommitId
);

/// A hex prefix accepted anywhere a full [`CommitId`]/[`ObjectHash`] is
/// accepted (spec §4.9, §6). Matching is over raw bytes so an odd-length
/// prefix (e.g. `"abc"`) still only matches ids whose corresponding nibble
/// agrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexPrefix {
    min_prefix_bytes: Vec<u8>,
    has_odd_nibble: bool,
}

impl HexPrefix {
    pub fn new(prefix: &str) -> Option<Self> {
        if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let even_prefix = if prefix.len() % 2 == 1 {
            format!("{prefix}0")
        } else {
            prefix.to_string()
        };
        let min_prefix_bytes = hex::decode(even_prefix).ok()?;
        Some(Self {
            min_prefix_bytes,
            has_odd_nibble: prefix.len() % 2 == 1,
        })
    }

    pub fn len(&self) -> usize {
        self.min_prefix_bytes.len() * 2 - usize::from(self.has_odd_nibble)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn matches(&self, id: &impl ObjectId) -> bool {
        let id_bytes = id.as_bytes();
        if self.has_odd_nibble {
            let (last, prefix) = self.min_prefix_bytes.split_last().expect("non-empty");
            id_bytes.starts_with(prefix)
                && matches!(id_bytes.get(prefix.len()), Some(b) if b & 0xf0 == last & 0xf0)
        } else {
            id_bytes.starts_with(&self.min_prefix_bytes)
        }
    }
}

impl fmt::Display for HexPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = hex::encode(&self.min_prefix_bytes);
        if self.has_odd_nibble {
            s.pop();
        }
        f.write_str(&s)
    }
}

/// Outcome of resolving a prefix against a collection of ids (spec §4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixResolution<T> {
    NoMatch,
    SingleMatch(T),
    AmbiguousMatch(Vec<T>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_prefix_matches_even_and_odd() {
        let id = CommitId::from_hex("1234ab").unwrap();
        assert!(HexPrefix::new("").unwrap().matches(&id));
        assert!(HexPrefix::new("1").unwrap().matches(&id));
        assert!(HexPrefix::new("12").unwrap().matches(&id));
        assert!(HexPrefix::new("123").unwrap().matches(&id));
        assert!(HexPrefix::new("1234ab").unwrap().matches(&id));
        assert!(!HexPrefix::new("1234ac").unwrap().matches(&id));
        assert!(!HexPrefix::new("a").unwrap().matches(&id));
    }

    #[test]
    fn hex_prefix_rejects_non_hex() {
        assert!(HexPrefix::new("ghij").is_none());
    }

    #[test]
    fn object_id_round_trips_hex() {
        let id = ObjectHash::new(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(id.hex(), "deadbeef");
        assert_eq!(ObjectHash::from_hex("deadbeef").unwrap(), id);
    }
}
