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

//! Immutable path→object manifests (spec §3's "Snapshot", §4.2).
//!
//! A [`Manifest`] is stored as structured JSON rather than an opaque byte
//! blob (spec §4.2: "callers traverse individual entries"), following the
//! same directory-sharding idea as [`crate::object_store::ObjectStore`] but
//! keyed by the manifest's own canonical hash.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::content_hash::sha256_str;
use crate::error::MuseError;
use crate::error::MuseResult;
use crate::file_util::create_or_reuse_dir;
use crate::file_util::persist_content_addressed_temp_file;
use crate::object_id::ObjectHash;
use crate::object_id::ObjectId as _;
use crate::object_id::SnapshotId;
use crate::repo_path::RepoPathBuf;

/// A path → object_id mapping. Entries are kept in a `BTreeMap`, which
/// sorts by `RepoPathBuf`'s byte-wise `Ord` — exactly the ordering spec
/// §4.2 requires before hashing, so [`Manifest::canonical_id`] never needs
/// to sort explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    entries: BTreeMap<RepoPathBuf, ObjectHash>,
}

/// Separator between a path and its object id within one rendered entry.
const PATH_OBJECT_SEP: &str = ":";
/// Separator between rendered entries.
const ENTRY_SEP: &str = "\n";

impl Manifest {
    pub fn from_entries(entries: BTreeMap<RepoPathBuf, ObjectHash>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &RepoPathBuf) -> Option<&ObjectHash> {
        self.entries.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &RepoPathBuf> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RepoPathBuf, &ObjectHash)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> BTreeMap<RepoPathBuf, ObjectHash> {
        self.entries
    }

    /// Derives `snapshot_id = SHA256(sorted "path:object_id" lines joined by
    /// a separator)` (spec §3, §4.2). Platform-independent: insertion order
    /// never affects the result since `BTreeMap` iteration is always sorted.
    pub fn canonical_id(&self) -> SnapshotId {
        let rendered = self
            .entries
            .iter()
            .map(|(path, object_id)| format!("{path}{PATH_OBJECT_SEP}{}", object_id.hex()))
            .collect::<Vec<_>>()
            .join(ENTRY_SEP);
        SnapshotId::new(sha256_str(&rendered))
    }
}

/// Store of immutable [`Manifest`]s, keyed by [`Manifest::canonical_id`]
/// (spec §4.2).
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// `root` is `.muse/snapshots`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn init(root: &Path) -> MuseResult<()> {
        create_or_reuse_dir(root)?;
        Ok(())
    }

    fn shard_dir(&self, id: &SnapshotId) -> PathBuf {
        self.root.join(&id.hex()[..2])
    }

    fn path(&self, id: &SnapshotId) -> PathBuf {
        self.shard_dir(id).join(format!("{}.json", &id.hex()[2..]))
    }

    /// Idempotent: re-`put`ting the same manifest is a no-op write.
    pub fn put(&self, manifest: &Manifest) -> MuseResult<SnapshotId> {
        let id = manifest.canonical_id();
        let dir = self.shard_dir(&id);
        create_or_reuse_dir(&dir)?;
        let path = self.path(&id);
        if path.exists() {
            return Ok(id);
        }
        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|source| MuseError::Json { path: path.clone(), source })?;
        let mut temp_file = NamedTempFile::new_in(&dir)?;
        {
            use std::io::Write as _;
            temp_file.write_all(&json)?;
        }
        persist_content_addressed_temp_file(temp_file, &path)?;
        Ok(id)
    }

    pub fn get(&self, id: &SnapshotId) -> MuseResult<Manifest> {
        let path = self.path(id);
        let bytes = fs::read(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                MuseError::missing_object(id)
            } else {
                MuseError::Io(err)
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|source| MuseError::Json { path, source })
    }

    pub fn has(&self, id: &SnapshotId) -> bool {
        self.path(id).is_file()
    }
}
