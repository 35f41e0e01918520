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

//! The commit pipeline (spec §4.6): workdir → manifest → snapshot → commit
//! → ref update, plus its amend variant.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::DateTime;
use chrono::Utc;
use tracing::debug;
use tracing::instrument;
use uuid::Uuid;

use crate::commit::timestamped_commit_id;
use crate::commit::Commit;
use crate::commit::Metadata;
use crate::commit_store::CommitStore;
use crate::error::MuseError;
use crate::error::MuseResult;
use crate::object_store::ObjectStore;
use crate::refs::RefCategory;
use crate::refs::RefName;
use crate::refs::RefStore;
use crate::snapshot::Manifest;
use crate::snapshot::SnapshotStore;
use crate::workdir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The working tree already matches HEAD's snapshot; no commit created.
    NothingToCommit,
    Created(crate::object_id::CommitId),
}

fn build_manifest(objects: &ObjectStore, workdir_root: &Path) -> MuseResult<Manifest> {
    let mut entries = BTreeMap::new();
    for (path, bytes) in workdir::walk_files(workdir_root)? {
        let hash = objects.put(&bytes)?;
        entries.insert(path, hash);
    }
    Ok(Manifest::from_entries(entries))
}

fn require_no_merge_in_progress(merge_state_path: &Path) -> MuseResult<()> {
    if merge_state_path.exists() {
        return Err(MuseError::MergeInProgress);
    }
    Ok(())
}

/// Records a new timestamped commit on `branch` from the current contents of
/// `workdir_root` (spec §4.6 steps 1–8).
#[instrument(skip(objects, snapshots, commits, refs, workdir_root, message, author, metadata), fields(%repo_id, branch = %branch))]
#[allow(clippy::too_many_arguments)]
pub fn commit(
    objects: &ObjectStore,
    snapshots: &SnapshotStore,
    commits: &CommitStore,
    refs: &RefStore,
    merge_state_path: &Path,
    workdir_root: &Path,
    branch: &RefName,
    repo_id: Uuid,
    message: &str,
    author: &str,
    metadata: Metadata,
    now: DateTime<Utc>,
) -> MuseResult<CommitOutcome> {
    require_no_merge_in_progress(merge_state_path)?;

    let manifest = build_manifest(objects, workdir_root)?;
    if manifest.is_empty() {
        return Err(MuseError::user("cannot commit an empty working tree"));
    }
    let snapshot_id = manifest.canonical_id();

    let parent = refs.read(RefCategory::Branch, branch)?;
    if let Some(parent_id) = &parent {
        let parent_commit = commits.get(parent_id)?;
        if parent_commit.snapshot_id == snapshot_id {
            debug!("nothing to commit: working tree matches HEAD's snapshot");
            return Ok(CommitOutcome::NothingToCommit);
        }
    }

    snapshots.put(&manifest)?;
    let parents: Vec<_> = parent.iter().cloned().collect();
    let commit_id = timestamped_commit_id(&parents, &snapshot_id, message, now);
    let new_commit = Commit {
        commit_id: commit_id.clone(),
        repo_id,
        branch: branch.as_str().to_string(),
        parent_commit_id: parent.clone(),
        parent2_commit_id: None,
        snapshot_id,
        message: message.to_string(),
        author: author.to_string(),
        committed_at: Some(now),
        metadata,
    };
    commits.insert(&new_commit)?;
    refs.compare_and_swap(RefCategory::Branch, branch, parent.as_ref(), Some(&commit_id))?;
    debug!(%commit_id, "created commit");
    Ok(CommitOutcome::Created(commit_id))
}

/// Creates a two-parent merge commit directly (used by the merge engine
/// after conflicts are resolved; spec §4.7's "resolving commit writes its
/// two parent IDs").
#[allow(clippy::too_many_arguments)]
pub fn commit_merge(
    objects: &ObjectStore,
    snapshots: &SnapshotStore,
    commits: &CommitStore,
    refs: &RefStore,
    workdir_root: &Path,
    branch: &RefName,
    repo_id: Uuid,
    ours: crate::object_id::CommitId,
    theirs: crate::object_id::CommitId,
    message: &str,
    author: &str,
    now: DateTime<Utc>,
) -> MuseResult<crate::object_id::CommitId> {
    let manifest = build_manifest(objects, workdir_root)?;
    if manifest.is_empty() {
        return Err(MuseError::user("cannot commit an empty working tree"));
    }
    let snapshot_id = manifest.canonical_id();
    snapshots.put(&manifest)?;

    let parents = vec![ours.clone(), theirs.clone()];
    let commit_id = timestamped_commit_id(&parents, &snapshot_id, message, now);
    let new_commit = Commit {
        commit_id: commit_id.clone(),
        repo_id,
        branch: branch.as_str().to_string(),
        parent_commit_id: Some(ours),
        parent2_commit_id: Some(theirs),
        snapshot_id,
        message: message.to_string(),
        author: author.to_string(),
        committed_at: Some(now),
        metadata: Metadata::new(),
    };
    commits.insert(&new_commit)?;
    refs.write(RefCategory::Branch, branch, &commit_id)?;
    Ok(commit_id)
}

/// Replaces `branch`'s HEAD commit with a new one whose parent is the
/// *original HEAD's parent* (spec §4.6's amend variant): `message` of
/// `None` keeps the original message (`no-edit`).
#[allow(clippy::too_many_arguments)]
pub fn amend(
    objects: &ObjectStore,
    snapshots: &SnapshotStore,
    commits: &CommitStore,
    refs: &RefStore,
    merge_state_path: &Path,
    workdir_root: &Path,
    branch: &RefName,
    repo_id: Uuid,
    message: Option<&str>,
    author: &str,
    metadata: Metadata,
    now: DateTime<Utc>,
) -> MuseResult<crate::object_id::CommitId> {
    require_no_merge_in_progress(merge_state_path)?;

    let head_id = refs
        .read(RefCategory::Branch, branch)?
        .ok_or_else(|| MuseError::user(format!("branch {branch} has no commits to amend")))?;
    let head_commit = commits.get(&head_id)?;

    let manifest = build_manifest(objects, workdir_root)?;
    if manifest.is_empty() {
        return Err(MuseError::user("cannot amend onto an empty working tree"));
    }
    let snapshot_id = manifest.canonical_id();
    snapshots.put(&manifest)?;

    let grandparent = head_commit.parent_commit_id.clone();
    let parents: Vec<_> = grandparent.iter().cloned().collect();
    let message = message.unwrap_or(&head_commit.message);
    let commit_id = timestamped_commit_id(&parents, &snapshot_id, message, now);
    let new_commit = Commit {
        commit_id: commit_id.clone(),
        repo_id,
        branch: branch.as_str().to_string(),
        parent_commit_id: grandparent,
        parent2_commit_id: None,
        snapshot_id,
        message: message.to_string(),
        author: author.to_string(),
        committed_at: Some(now),
        metadata,
    };
    commits.insert(&new_commit)?;
    refs.compare_and_swap(RefCategory::Branch, branch, Some(&head_id), Some(&commit_id))?;
    Ok(commit_id)
}
