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

//! SHA-256 content hashing, grounded on `jj-lib`'s `content_hash.rs`
//! (`blake2b_hash`) but swapped to SHA-256 per spec §3/§17: object,
//! snapshot and commit ids must be Git-compatible 64-char hex digests.

use sha2::Digest as _;
use sha2::Sha256;

/// Hashes raw bytes, returning the 32-byte SHA-256 digest.
pub fn sha256_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().to_vec()
}

/// Hashes a UTF-8 string, returning the 32-byte SHA-256 digest. Used for
/// every canonical-serialization-then-hash step in this crate (manifests,
/// commits) so the exact byte sequence being hashed is always explicit at
/// the call site rather than hidden behind a generic derive.
pub fn sha256_str(s: &str) -> Vec<u8> {
    sha256_bytes(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        // echo -n "" | sha256sum
        assert_eq!(
            hex::encode(sha256_bytes(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }
}
