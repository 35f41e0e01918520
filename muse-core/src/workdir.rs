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

//! Working-tree diff (spec §4.5): compare `muse-work/` against a snapshot.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::content_hash::sha256_bytes;
use crate::error::MuseResult;
use crate::object_id::ObjectHash;
use crate::object_store::ObjectStore;
use crate::repo_path::RepoPathBuf;
use crate::snapshot::Manifest;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkdirDiff {
    pub added: BTreeSet<RepoPathBuf>,
    pub modified: BTreeSet<RepoPathBuf>,
    pub removed: BTreeSet<RepoPathBuf>,
    pub unchanged: BTreeSet<RepoPathBuf>,
}

impl WorkdirDiff {
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Recursively reads every regular file under `workdir_root`, hashing it,
/// and classifies it against `manifest` (spec §4.5: "a file is 'modified'
/// iff its SHA-256 differs from the manifest's object_id for the same
/// path").
pub fn diff(workdir_root: &Path, manifest: &Manifest) -> MuseResult<WorkdirDiff> {
    let mut seen = BTreeSet::new();
    let mut result = WorkdirDiff::default();

    for (path, contents) in walk_files(workdir_root)? {
        seen.insert(path.clone());
        let actual_hash = ObjectHash::new(sha256_bytes(&contents));
        match manifest.get(&path) {
            Some(expected_hash) if expected_hash == &actual_hash => {
                result.unchanged.insert(path);
            }
            Some(_) => {
                result.modified.insert(path);
            }
            None => {
                result.added.insert(path);
            }
        }
    }

    for path in manifest.paths() {
        if !seen.contains(path) {
            result.removed.insert(path.clone());
        }
    }

    Ok(result)
}

/// Every regular file under `root`, as (repo-relative path, contents) pairs.
pub fn walk_files(root: &Path) -> MuseResult<Vec<(RepoPathBuf, Vec<u8>)>> {
    let mut out = Vec::new();
    if root.is_dir() {
        walk_files_into(root, root, &mut out)?;
    }
    Ok(out)
}

fn walk_files_into(root: &Path, dir: &Path, out: &mut Vec<(RepoPathBuf, Vec<u8>)>) -> MuseResult<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);
    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk_files_into(root, &path, out)?;
        } else if file_type.is_file() {
            let relative = path.strip_prefix(root).expect("walked path is under root");
            let repo_path = RepoPathBuf::from_relative_path(relative)
                .expect("filesystem walk never yields an invalid relative path");
            out.push((repo_path, fs::read(&path)?));
        }
    }
    Ok(())
}

/// Writes every entry of `target` into `workdir_root`, then deletes any file
/// that was present in `previous` (the manifest the working tree was
/// supposedly at) but has no entry in `target` — used by checkout, reset
/// `--hard`, and the merge engine (spec §4.8: "restore workdir from target
/// snapshot; delete workdir files not present in target snapshot").
pub fn restore_to_manifest(
    objects: &ObjectStore,
    workdir_root: &Path,
    previous: Option<&Manifest>,
    target: &Manifest,
) -> MuseResult<()> {
    for (path, hash) in target.iter() {
        let bytes = objects.get(hash)?;
        let dest = workdir_root.join(path.as_std_path());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, bytes)?;
    }
    if let Some(previous) = previous {
        for path in previous.paths() {
            if target.get(path).is_none() {
                let dest = workdir_root.join(path.as_std_path());
                if dest.is_file() {
                    fs::remove_file(&dest)?;
                }
            }
        }
    }
    Ok(())
}
