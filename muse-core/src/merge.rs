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

//! The merge engine (spec §4.7): merge-base (LCA), three-way manifest diff,
//! merge application, and `MERGE_STATE.json` persistence.
//!
//! Grounded on `jj-lib`'s `rewrite.rs` for the overall "compute, persist,
//! let the user resolve, then commit" shape; the LCA and three-way diff
//! algorithms themselves are distilled directly from spec.md §4.7 rather
//! than adapted from jj's n-ary conflict-marker merge, since Muse only ever
//! merges two manifests at the file-object granularity.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::fs;
use std::io::Write as _;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::instrument;

use crate::commit_store::CommitStore;
use crate::error::MuseError;
use crate::error::MuseResult;
use crate::file_util::persist_temp_file;
use crate::object_id::CommitId;
use crate::object_id::ObjectId as _;
use crate::repo_path::RepoPathBuf;
use crate::snapshot::Manifest;

/// Finds the most recent common ancestor of `a` and `b` (spec §4.7): BFS
/// from `a` marking every ancestor, then BFS from `b` in order, returning
/// the first node already marked. `LCA(a, a) = a`; disjoint histories yield
/// `None`.
pub fn merge_base(commits: &CommitStore, a: &CommitId, b: &CommitId) -> MuseResult<Option<CommitId>> {
    let ancestors_of_a: HashSet<CommitId> = commits.ancestors(a)?;

    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([b.clone()]);
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if ancestors_of_a.contains(&id) {
            return Ok(Some(id));
        }
        let commit = commits.get(&id)?;
        queue.extend(commit.parent_ids());
    }
    Ok(None)
}

/// Paths where `side` differs from `base`: added, removed, or changed
/// content (spec §4.7's `ours_changed`/`theirs_changed`).
fn changed_paths(base: &Manifest, side: &Manifest) -> BTreeSet<RepoPathBuf> {
    let mut all_paths: BTreeSet<&RepoPathBuf> = base.paths().collect();
    all_paths.extend(side.paths());
    all_paths
        .into_iter()
        .filter(|path| base.get(path) != side.get(path))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDiff3 {
    pub ours_changed: BTreeSet<RepoPathBuf>,
    pub theirs_changed: BTreeSet<RepoPathBuf>,
    /// Paths changed by both sides in ways that disagree (spec §4.7: "when
    /// both sides make the identical change, no conflict").
    pub conflict_paths: BTreeSet<RepoPathBuf>,
}

pub fn diff3(base: &Manifest, ours: &Manifest, theirs: &Manifest) -> ManifestDiff3 {
    let ours_changed = changed_paths(base, ours);
    let theirs_changed = changed_paths(base, theirs);
    let conflict_paths = ours_changed
        .intersection(&theirs_changed)
        .filter(|path| ours.get(path) != theirs.get(path))
        .cloned()
        .collect();
    ManifestDiff3 { ours_changed, theirs_changed, conflict_paths }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeApplication {
    pub manifest: Manifest,
    pub conflict_paths: BTreeSet<RepoPathBuf>,
}

/// Produces the merged manifest (spec §4.7's "Merge application"): unchanged
/// paths keep base, paths changed on exactly one side take that side, and
/// conflicting paths keep the base version while the conflict is recorded.
pub fn merge_manifests(base: &Manifest, ours: &Manifest, theirs: &Manifest) -> MergeApplication {
    let diff = diff3(base, ours, theirs);

    let mut all_paths: BTreeSet<&RepoPathBuf> = base.paths().collect();
    all_paths.extend(ours.paths());
    all_paths.extend(theirs.paths());

    let mut entries = BTreeMap::new();
    for path in all_paths {
        let resolved = if diff.conflict_paths.contains(path) {
            base.get(path)
        } else if diff.ours_changed.contains(path) {
            ours.get(path)
        } else if diff.theirs_changed.contains(path) {
            theirs.get(path)
        } else {
            base.get(path)
        };
        if let Some(hash) = resolved {
            entries.insert(path.clone(), hash.clone());
        }
    }

    MergeApplication {
        manifest: Manifest::from_entries(entries),
        conflict_paths: diff.conflict_paths,
    }
}

/// A transient record of an in-progress merge (spec §3's "Merge state").
/// While the file backing this exists, mutating operations besides the
/// resolving commit are blocked (`MuseError::MergeInProgress`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeState {
    pub base_commit: CommitId,
    pub ours_commit: CommitId,
    pub theirs_commit: CommitId,
    pub conflict_paths: Vec<RepoPathBuf>,
    pub other_branch: String,
}

pub fn merge_state_path(muse_dir: &Path) -> std::path::PathBuf {
    muse_dir.join("MERGE_STATE.json")
}

pub fn load_merge_state(path: &Path) -> MuseResult<Option<MergeState>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(
            serde_json::from_slice(&bytes).map_err(|source| MuseError::Json { path: path.to_path_buf(), source })?,
        )),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(MuseError::Io(err)),
    }
}

pub fn save_merge_state(path: &Path, state: &MergeState) -> MuseResult<()> {
    let json = serde_json::to_vec_pretty(state)
        .map_err(|source| MuseError::Json { path: path.to_path_buf(), source })?;
    let dir = path.parent().expect("merge state path has a parent");
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(&json)?;
    persist_temp_file(temp_file, path)?;
    Ok(())
}

pub fn clear_merge_state(path: &Path) -> MuseResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(MuseError::Io(err)),
    }
}

/// Outcome of starting a merge (spec §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStart {
    /// No conflicts: the merge commit was created immediately, with the two
    /// given parents.
    Clean(CommitId),
    /// Conflicts were recorded to `MERGE_STATE.json`; the working tree holds
    /// the base version at each conflicting path pending user resolution.
    Conflicts(Vec<RepoPathBuf>),
}

/// Runs the merge-base + three-way diff + apply pipeline for merging
/// `theirs` into `ours`, restores the working tree to the merge result, and
/// either creates the merge commit directly (no conflicts) or persists
/// `MERGE_STATE.json` (spec §4.7).
#[instrument(skip(objects, snapshots, commits, refs, workdir_root, author), fields(%ours, %theirs))]
#[allow(clippy::too_many_arguments)]
pub fn start_merge(
    objects: &crate::object_store::ObjectStore,
    snapshots: &crate::snapshot::SnapshotStore,
    commits: &CommitStore,
    refs: &crate::refs::RefStore,
    merge_state_file: &Path,
    workdir_root: &Path,
    branch: &crate::refs::RefName,
    repo_id: uuid::Uuid,
    ours: CommitId,
    theirs: CommitId,
    other_branch: &str,
    message: &str,
    author: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> MuseResult<MergeStart> {
    if merge_state_file.exists() {
        return Err(MuseError::MergeInProgress);
    }

    let base = merge_base(commits, &ours, &theirs)?.ok_or_else(|| MuseError::NoCommonAncestor {
        left: ours.hex(),
        right: theirs.hex(),
    })?;

    let base_commit = commits.get(&base)?;
    let ours_commit = commits.get(&ours)?;
    let theirs_commit = commits.get(&theirs)?;

    let base_manifest = snapshots.get(&base_commit.snapshot_id)?;
    let ours_manifest = snapshots.get(&ours_commit.snapshot_id)?;
    let theirs_manifest = snapshots.get(&theirs_commit.snapshot_id)?;

    let application = merge_manifests(&base_manifest, &ours_manifest, &theirs_manifest);
    crate::workdir::restore_to_manifest(objects, workdir_root, Some(&ours_manifest), &application.manifest)?;

    if application.conflict_paths.is_empty() {
        let commit_id = crate::pipeline::commit_merge(
            objects, snapshots, commits, refs, workdir_root, branch, repo_id, ours, theirs, message, author, now,
        )?;
        Ok(MergeStart::Clean(commit_id))
    } else {
        let conflict_paths: Vec<_> = application.conflict_paths.into_iter().collect();
        save_merge_state(
            merge_state_file,
            &MergeState {
                base_commit: base,
                ours_commit: ours,
                theirs_commit: theirs,
                conflict_paths: conflict_paths.clone(),
                other_branch: other_branch.to_string(),
            },
        )?;
        Ok(MergeStart::Conflicts(conflict_paths))
    }
}
