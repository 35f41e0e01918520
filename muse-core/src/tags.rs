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

//! The tag annotation index (spec §3's "Tag annotation", §4.11).
//!
//! Distinct from the lightweight `refs/tags/<tag>` pointers in
//! [`crate::refs`]: an annotation is a many-to-many `(commit_id, tag_string)`
//! row, namespaced by convention as `<namespace>:<value>` (`emotion:`,
//! `section:`, `track:`), used by the musical analysis services in
//! [`crate::analysis`]. Persisted as one JSON file (`.muse/tags.json`) since
//! a single repository's tag set is small enough that there's no benefit to
//! the content-addressed sharded layout the other stores use.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::MuseError;
use crate::error::MuseResult;
use crate::file_util::persist_temp_file;
use crate::object_id::CommitId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TagData {
    by_commit: BTreeMap<CommitId, BTreeSet<String>>,
}

/// Handle onto `.muse/tags.json`. Every mutating call reads, mutates, and
/// writes back the whole file; callers are expected to hold the repository
/// lock for the duration (spec §5: single-writer-per-repository).
#[derive(Debug, Clone)]
pub struct TagIndex {
    path: PathBuf,
}

impl TagIndex {
    /// `path` is `.muse/tags.json`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn init(path: &Path) -> MuseResult<()> {
        if !path.exists() {
            Self::new(path.to_path_buf()).save(&TagData::default())?;
        }
        Ok(())
    }

    fn load(&self) -> MuseResult<TagData> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| MuseError::Json { path: self.path.clone(), source }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(TagData::default()),
            Err(err) => Err(MuseError::Io(err)),
        }
    }

    fn save(&self, data: &TagData) -> MuseResult<()> {
        let json = serde_json::to_vec_pretty(data)
            .map_err(|source| MuseError::Json { path: self.path.clone(), source })?;
        let dir = self.path.parent().expect("tag index path has a parent");
        let mut temp_file = NamedTempFile::new_in(dir)?;
        temp_file.write_all(&json)?;
        persist_temp_file(temp_file, &self.path)?;
        Ok(())
    }

    /// Idempotent: adding a tag already present on `commit_id` is a no-op
    /// (spec §3: "idempotent re-add is a no-op").
    pub fn add(&self, commit_id: &CommitId, tag: &str) -> MuseResult<()> {
        let mut data = self.load()?;
        data.by_commit.entry(commit_id.clone()).or_default().insert(tag.to_string());
        self.save(&data)
    }

    pub fn remove(&self, commit_id: &CommitId, tag: &str) -> MuseResult<()> {
        let mut data = self.load()?;
        if let Some(tags) = data.by_commit.get_mut(commit_id) {
            tags.remove(tag);
            if tags.is_empty() {
                data.by_commit.remove(commit_id);
            }
        }
        self.save(&data)
    }

    pub fn tags_for(&self, commit_id: &CommitId) -> MuseResult<BTreeSet<String>> {
        Ok(self.load()?.by_commit.get(commit_id).cloned().unwrap_or_default())
    }

    /// Single batched read for a whole commit set (spec §4.11: "avoid N+1").
    pub fn tags_for_many(
        &self,
        commit_ids: &[CommitId],
    ) -> MuseResult<BTreeMap<CommitId, BTreeSet<String>>> {
        let data = self.load()?;
        Ok(commit_ids
            .iter()
            .map(|id| (id.clone(), data.by_commit.get(id).cloned().unwrap_or_default()))
            .collect())
    }

    pub fn commits_with_tag(&self, tag: &str) -> MuseResult<Vec<CommitId>> {
        let data = self.load()?;
        let mut matches: Vec<CommitId> = data
            .by_commit
            .iter()
            .filter(|(_, tags)| tags.contains(tag))
            .map(|(id, _)| id.clone())
            .collect();
        matches.sort();
        Ok(matches)
    }

    pub fn commits_with_tag_prefix(&self, prefix: &str) -> MuseResult<Vec<(CommitId, String)>> {
        let data = self.load()?;
        let mut matches: Vec<(CommitId, String)> = data
            .by_commit
            .iter()
            .flat_map(|(id, tags)| {
                tags.iter()
                    .filter(|tag| tag.starts_with(prefix))
                    .map(move |tag| (id.clone(), tag.clone()))
            })
            .collect();
        matches.sort();
        Ok(matches)
    }
}
