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

//! The commit DAG store (spec §4.3).
//!
//! Same content-addressed-directory shape as [`crate::object_store`] and
//! [`crate::snapshot`] (grounded on `jj-lib`'s `SimpleBackend`), but for
//! commits: `create_commit` is an idempotent insert (same derived id ⇒ same
//! file, second write is a no-op), `get_commit` reads it back, and
//! `walk_parents`/`find_by_prefix`/`ancestors` implement the DAG queries
//! spec §4.3 and §4.7 (merge-base) need.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::commit::Commit;
use crate::error::MuseError;
use crate::error::MuseResult;
use crate::file_util::create_or_reuse_dir;
use crate::file_util::persist_content_addressed_temp_file;
use crate::object_id::CommitId;
use crate::object_id::HexPrefix;
use crate::object_id::ObjectId as _;

#[derive(Debug, Clone)]
pub struct CommitStore {
    root: PathBuf,
}

impl CommitStore {
    /// `root` is `.muse/commits`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn init(root: &Path) -> MuseResult<()> {
        create_or_reuse_dir(root)?;
        Ok(())
    }

    fn shard_dir(&self, id: &CommitId) -> PathBuf {
        self.root.join(&id.hex()[..2])
    }

    fn path(&self, id: &CommitId) -> PathBuf {
        self.shard_dir(id).join(format!("{}.json", &id.hex()[2..]))
    }

    /// Idempotent insert: when `commit.commit_id` already exists on disk the
    /// write is skipped (spec §4.3: "the operation is a no-op").
    pub fn insert(&self, commit: &Commit) -> MuseResult<CommitId> {
        let dir = self.shard_dir(&commit.commit_id);
        create_or_reuse_dir(&dir)?;
        let path = self.path(&commit.commit_id);
        if path.exists() {
            return Ok(commit.commit_id.clone());
        }
        let json = serde_json::to_vec_pretty(commit)
            .map_err(|source| MuseError::Json { path: path.clone(), source })?;
        let mut temp_file = NamedTempFile::new_in(&dir)?;
        {
            use std::io::Write as _;
            temp_file.write_all(&json)?;
        }
        persist_content_addressed_temp_file(temp_file, &path)?;
        Ok(commit.commit_id.clone())
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.path(id).is_file()
    }

    pub fn get(&self, id: &CommitId) -> MuseResult<Commit> {
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

    /// Every stored commit id, in no particular order. Used by prefix
    /// lookup and by analyses that need the whole history (e.g. `grep
    /// --all-branches`, `inspect`).
    pub fn all_ids(&self) -> MuseResult<Vec<CommitId>> {
        let mut ids = Vec::new();
        if !self.root.is_dir() {
            return Ok(ids);
        }
        for shard_entry in fs::read_dir(&self.root)? {
            let shard_entry = shard_entry?;
            if !shard_entry.file_type()?.is_dir() {
                continue;
            }
            let shard_hex = shard_entry.file_name().to_string_lossy().into_owned();
            for file_entry in fs::read_dir(shard_entry.path())? {
                let file_entry = file_entry?;
                let file_name = file_entry.file_name().to_string_lossy().into_owned();
                let Some(rest_hex) = file_name.strip_suffix(".json") else {
                    continue;
                };
                if let Some(id) = CommitId::from_hex(&format!("{shard_hex}{rest_hex}")) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    /// Finds all stored commit ids matching `prefix` (spec §4.3, §4.9).
    pub fn find_by_prefix(&self, prefix: &HexPrefix) -> MuseResult<Vec<CommitId>> {
        Ok(self
            .all_ids()?
            .into_iter()
            .filter(|id| prefix.matches(id))
            .collect())
    }

    /// First-parent walk starting at (and including) `start`, newest first,
    /// bounded by `limit` (spec §4.3).
    pub fn walk_first_parent(&self, start: &CommitId, limit: Option<usize>) -> MuseResult<Vec<Commit>> {
        let mut result = Vec::new();
        let mut current = Some(start.clone());
        while let Some(id) = current {
            if let Some(limit) = limit {
                if result.len() >= limit {
                    break;
                }
            }
            let commit = self.get(&id)?;
            current = commit.parent_commit_id.clone();
            result.push(commit);
        }
        Ok(result)
    }

    /// All ancestors of `start`, including `start` itself (exhaustive BFS;
    /// spec §4.7's merge-base algorithm marks ancestors this way).
    pub fn ancestors(&self, start: &CommitId) -> MuseResult<HashSet<CommitId>> {
        let mut seen = HashSet::new();
        let mut queue = vec![start.clone()];
        while let Some(id) = queue.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let commit = self.get(&id)?;
            queue.extend(commit.parent_ids());
        }
        Ok(seen)
    }
}
