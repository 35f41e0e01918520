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

//! Content-addressed blob store (spec §4.1).
//!
//! Grounded on `jj-lib`'s `SimpleBackend` file-per-object layout
//! (`examples/yuja-jj/lib/src/simple_backend.rs`): a directory per object
//! kind, content-addressed filenames, writes staged through a
//! `NamedTempFile` and persisted atomically. Unlike `SimpleBackend` this
//! store shards by the first two hex characters (spec §4.1's
//! `.muse/objects/<xx>/<yyyyyy…>`) to keep any one directory small, and
//! hashes with SHA-256 rather than Blake2b512 (see SPEC_FULL.md §17).

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::content_hash::sha256_bytes;
use crate::error::MuseError;
use crate::error::MuseResult;
use crate::file_util::create_or_reuse_dir;
use crate::file_util::persist_content_addressed_temp_file;
use crate::object_id::ObjectHash;
use crate::object_id::ObjectId as _;

/// Content-addressed store of immutable byte blobs (spec §4.1).
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// `root` is `.muse/objects`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn init(root: &Path) -> MuseResult<()> {
        create_or_reuse_dir(root)?;
        Ok(())
    }

    fn shard_dir(&self, id: &ObjectHash) -> PathBuf {
        self.root.join(&id.hex()[..2])
    }

    fn path(&self, id: &ObjectHash) -> PathBuf {
        self.shard_dir(id).join(&id.hex()[2..])
    }

    /// Idempotent: writing already-present bytes does not rewrite the file
    /// on disk (mtime preserved), so retries are safe (spec §4.1).
    pub fn put(&self, bytes: &[u8]) -> MuseResult<ObjectHash> {
        let id = ObjectHash::new(sha256_bytes(bytes));
        let dir = self.shard_dir(&id);
        create_or_reuse_dir(&dir)?;
        let path = self.path(&id);
        if path.exists() {
            return Ok(id);
        }
        let mut temp_file = NamedTempFile::new_in(&dir)?;
        {
            use std::io::Write as _;
            temp_file.write_all(bytes)?;
        }
        persist_content_addressed_temp_file(temp_file, &path)?;
        Ok(id)
    }

    pub fn has(&self, id: &ObjectHash) -> bool {
        self.path(id).is_file()
    }

    pub fn get(&self, id: &ObjectHash) -> MuseResult<Vec<u8>> {
        fs::read(self.path(id)).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                MuseError::missing_object(id)
            } else {
                MuseError::Io(err)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::new_temp_dir;

    fn new_store() -> (tempfile::TempDir, ObjectStore) {
        let dir = new_temp_dir();
        let root = dir.path().join("objects");
        ObjectStore::init(&root).unwrap();
        (dir, ObjectStore::new(root))
    }

    #[test]
    fn put_is_idempotent_and_roundtrips() {
        let (_dir, store) = new_store();
        let id1 = store.put(b"hello world").unwrap();
        let id2 = store.put(b"hello world").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.get(&id1).unwrap(), b"hello world");
    }

    #[test]
    fn distinct_content_deduplicates_by_hash() {
        let (_dir, store) = new_store();
        let a = store.put(b"shared").unwrap();
        let b = store.put(b"shared").unwrap();
        assert_eq!(a, b);
        let c = store.put(b"different").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn missing_object_is_a_named_error() {
        let (_dir, store) = new_store();
        let bogus = ObjectHash::new(vec![0u8; 32]);
        let err = store.get(&bogus).unwrap_err();
        assert!(matches!(err, MuseError::MissingObject { .. }));
    }

    #[test]
    fn has_reflects_presence() {
        let (_dir, store) = new_store();
        let id = store.put(b"x").unwrap();
        assert!(store.has(&id));
        let bogus = ObjectHash::new(vec![1u8; 32]);
        assert!(!store.has(&bogus));
    }
}
