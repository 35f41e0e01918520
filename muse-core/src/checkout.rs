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

//! Checkout and reset (spec §4.8).
//!
//! Per SPEC_FULL.md's recorded open-question decision, `mixed` reset is
//! equivalent to `soft` here: there is no staging index to partially
//! update, so both modes only move the branch ref.

use std::path::Path;

use tracing::instrument;

use crate::commit_store::CommitStore;
use crate::error::MuseError;
use crate::error::MuseResult;
use crate::object_id::CommitId;
use crate::object_store::ObjectStore;
use crate::refs::RefCategory;
use crate::refs::RefName;
use crate::refs::RefStore;
use crate::snapshot::Manifest;
use crate::snapshot::SnapshotStore;
use crate::workdir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    Soft,
    Mixed,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    AlreadyOnBranch,
    SwitchedExisting,
    CreatedAndSwitched,
}

fn require_no_merge_in_progress(merge_state_path: &Path) -> MuseResult<()> {
    if merge_state_path.exists() {
        return Err(MuseError::MergeInProgress);
    }
    Ok(())
}

fn manifest_for(commits: &CommitStore, snapshots: &SnapshotStore, commit_id: &CommitId) -> MuseResult<Manifest> {
    let commit = commits.get(commit_id)?;
    snapshots.get(&commit.snapshot_id)
}

/// Switches `HEAD` to an existing branch (spec §4.8's "Existing branch"
/// mode): requires a clean working tree unless `force`.
#[instrument(skip(objects, commits, snapshots, refs, workdir_root), fields(branch = %target_branch))]
pub fn checkout_existing(
    objects: &ObjectStore,
    commits: &CommitStore,
    snapshots: &SnapshotStore,
    refs: &RefStore,
    merge_state_path: &Path,
    workdir_root: &Path,
    target_branch: &RefName,
    force: bool,
) -> MuseResult<CheckoutOutcome> {
    require_no_merge_in_progress(merge_state_path)?;

    if let crate::refs::Head::Branch(current) = refs.read_head()? {
        if &current == target_branch {
            return Ok(CheckoutOutcome::AlreadyOnBranch);
        }
    }

    let current_head = refs.resolve_head()?;
    let current_manifest = current_head
        .as_ref()
        .map(|id| manifest_for(commits, snapshots, id))
        .transpose()?;

    if !force {
        if let Some(manifest) = &current_manifest {
            let diff = workdir::diff(workdir_root, manifest)?;
            if !diff.is_clean() {
                return Err(MuseError::user(
                    "working tree has uncommitted changes; commit, discard them, or use --force",
                ));
            }
        }
    }

    let target_head = refs.read(RefCategory::Branch, target_branch)?;
    if target_head != current_head {
        let target_manifest = target_head
            .as_ref()
            .map(|id| manifest_for(commits, snapshots, id))
            .transpose()?
            .unwrap_or_default();
        workdir::restore_to_manifest(objects, workdir_root, current_manifest.as_ref(), &target_manifest)?;
    }

    refs.set_head_branch(target_branch)?;
    Ok(CheckoutOutcome::SwitchedExisting)
}

/// Creates a new branch at the current `HEAD` and switches to it (spec
/// §4.8's `-b` mode).
pub fn checkout_new(refs: &RefStore, merge_state_path: &Path, new_branch: &RefName) -> MuseResult<CheckoutOutcome> {
    require_no_merge_in_progress(merge_state_path)?;

    if refs.read(RefCategory::Branch, new_branch)?.is_some() {
        return Err(MuseError::user(format!("branch {new_branch} already exists")));
    }
    if let Some(head_commit) = refs.resolve_head()? {
        refs.write(RefCategory::Branch, new_branch, &head_commit)?;
    }
    refs.set_head_branch(new_branch)?;
    Ok(CheckoutOutcome::CreatedAndSwitched)
}

/// Moves `branch`'s ref to `target`, optionally restoring the working tree
/// (spec §4.8's three reset modes).
#[instrument(skip(objects, commits, snapshots, refs, workdir_root), fields(branch = %branch, ?mode))]
pub fn reset(
    objects: &ObjectStore,
    commits: &CommitStore,
    snapshots: &SnapshotStore,
    refs: &RefStore,
    merge_state_path: &Path,
    workdir_root: &Path,
    branch: &RefName,
    target: &CommitId,
    mode: ResetMode,
) -> MuseResult<()> {
    require_no_merge_in_progress(merge_state_path)?;

    let current = refs.read(RefCategory::Branch, branch)?;
    refs.compare_and_swap(RefCategory::Branch, branch, current.as_ref(), Some(target))?;

    if mode == ResetMode::Hard {
        let previous_manifest = current
            .as_ref()
            .map(|id| manifest_for(commits, snapshots, id))
            .transpose()?;
        let target_manifest = manifest_for(commits, snapshots, target)?;
        workdir::restore_to_manifest(objects, workdir_root, previous_manifest.as_ref(), &target_manifest)?;
    }

    Ok(())
}
