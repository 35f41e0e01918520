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

//! Rebase replay (spec §1, §9, GLOSSARY's "Rebase replay"): rewrites a
//! branch's first-parent chain above its merge-base with `onto` to sit on
//! top of `onto` instead, deriving each replayed commit's id deterministically
//! (plumbing hashing, spec §4.3) so replaying the same chain onto the same
//! base twice yields an identical resulting chain (spec §8's idempotence
//! property).
//!
//! Grounded on `jj-lib`'s `rewrite.rs` `rebase_commit`/`CommitRewriter` (walk
//! the chain being moved, recompute each commit against its new parent, write
//! the rewritten commit, carry the result forward as the next commit's new
//! parent) but expressed over whole-manifest three-way merge instead of
//! `jj-lib`'s tree-level conflict merge, since Muse has no sub-file diff
//! model (spec §1's Non-goals: "does not interpret musical semantics during
//! merge — content is merged at the file-object level").
//!
//! Per `SPEC_FULL.md` §9's recorded Open Question resolution: a replayed
//! commit that would itself conflict against the commit built so far stops
//! the rebase with [`MuseError::UserError`] naming the offending commit,
//! rather than silently keeping the base version or guessing a resolution.

use std::path::Path;

use tracing::instrument;
use uuid::Uuid;

use crate::commit::plumbing_commit_id;
use crate::commit::Commit;
use crate::commit_store::CommitStore;
use crate::error::MuseError;
use crate::error::MuseResult;
use crate::merge::merge_manifests;
use crate::object_id::CommitId;
use crate::object_id::ObjectId as _;
use crate::object_store::ObjectStore;
use crate::refs::RefCategory;
use crate::refs::RefName;
use crate::refs::RefStore;
use crate::snapshot::Manifest;
use crate::snapshot::SnapshotStore;
use crate::workdir;

/// Outcome of a rebase (spec §9's rebase replay).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// `branch` already had `onto` as an ancestor; nothing to replay.
    NoOp,
    /// `branch`'s tip was itself an ancestor of `onto`; the branch ref was
    /// moved directly to `onto` without replaying any commit.
    FastForwarded(CommitId),
    /// `commits` original ids were replayed, oldest first, onto `onto`. The
    /// branch ref now points at `new_tip`.
    Rebased {
        new_tip: CommitId,
        replayed: Vec<CommitId>,
    },
}

fn require_no_merge_in_progress(merge_state_path: &Path) -> MuseResult<()> {
    if merge_state_path.exists() {
        return Err(MuseError::MergeInProgress);
    }
    Ok(())
}

fn manifest_of(commits: &CommitStore, snapshots: &SnapshotStore, commit_id: &CommitId) -> MuseResult<Manifest> {
    let commit = commits.get(commit_id)?;
    snapshots.get(&commit.snapshot_id)
}

fn manifest_of_parent(commits: &CommitStore, snapshots: &SnapshotStore, commit: &Commit) -> MuseResult<Manifest> {
    match &commit.parent_commit_id {
        Some(parent_id) => manifest_of(commits, snapshots, parent_id),
        None => Ok(Manifest::default()),
    }
}

/// Moves `branch`'s commits above its merge-base with `onto` to replay on
/// top of `onto` (spec §1, §9). Only a first-parent chain is replayed; a
/// merge commit within the chain stops the rebase with `UserError` (rebasing
/// merge commits is not specified and left as the source's noted follow-up,
/// see `SPEC_FULL.md` §9).
#[instrument(skip(objects, snapshots, commits, refs, workdir_root, author), fields(%repo_id, branch = %branch, %onto))]
#[allow(clippy::too_many_arguments)]
pub fn rebase(
    objects: &ObjectStore,
    snapshots: &SnapshotStore,
    commits: &CommitStore,
    refs: &RefStore,
    merge_state_path: &Path,
    workdir_root: &Path,
    branch: &RefName,
    repo_id: Uuid,
    onto: CommitId,
    author: &str,
) -> MuseResult<RebaseOutcome> {
    require_no_merge_in_progress(merge_state_path)?;

    let tip = refs
        .read(RefCategory::Branch, branch)?
        .ok_or_else(|| MuseError::user(format!("branch {branch} has no commits to rebase")))?;

    if tip == onto {
        return Ok(RebaseOutcome::NoOp);
    }

    let base = crate::merge::merge_base(commits, &tip, &onto)?.ok_or_else(|| MuseError::NoCommonAncestor {
        left: tip.hex(),
        right: onto.hex(),
    })?;

    if base == onto {
        // `onto` is already an ancestor of `tip`: the branch already
        // contains it, nothing to replay.
        return Ok(RebaseOutcome::NoOp);
    }

    if base == tip {
        // `tip` is an ancestor of `onto`: a pure fast-forward, no commit
        // needs to be rewritten.
        refs.compare_and_swap(RefCategory::Branch, branch, Some(&tip), Some(&onto))?;
        let target_manifest = manifest_of(commits, snapshots, &onto)?;
        let previous_manifest = manifest_of(commits, snapshots, &tip)?;
        workdir::restore_to_manifest(objects, workdir_root, Some(&previous_manifest), &target_manifest)?;
        return Ok(RebaseOutcome::FastForwarded(onto));
    }

    let mut chain = Vec::new();
    let mut cursor = tip.clone();
    loop {
        if cursor == base {
            break;
        }
        let commit = commits.get(&cursor)?;
        if commit.is_merge() {
            return Err(MuseError::user(format!(
                "cannot rebase merge commit {} onto {}: rebasing merge commits is unsupported",
                commit.commit_id.hex(),
                onto.hex()
            )));
        }
        let parent = commit.parent_commit_id.clone().ok_or_else(|| {
            MuseError::NoCommonAncestor { left: tip.hex(), right: onto.hex() }
        })?;
        chain.push(commit);
        cursor = parent;
    }
    chain.reverse();

    let mut new_parent = onto;
    let mut replayed = Vec::with_capacity(chain.len());
    for original in &chain {
        let base_manifest = manifest_of_parent(commits, snapshots, original)?;
        let ours_manifest = manifest_of(commits, snapshots, &new_parent)?;
        let theirs_manifest = snapshots.get(&original.snapshot_id)?;

        let application = merge_manifests(&base_manifest, &ours_manifest, &theirs_manifest);
        if !application.conflict_paths.is_empty() {
            return Err(MuseError::user(format!(
                "rebase stopped: replaying {} onto {} conflicts at {:?}",
                original.commit_id.hex(),
                new_parent.hex(),
                application.conflict_paths
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            )));
        }

        let snapshot_id = application.manifest.canonical_id();
        snapshots.put(&application.manifest)?;

        let parents = vec![new_parent.clone()];
        let new_commit_id = plumbing_commit_id(&parents, &snapshot_id, &original.message, author);
        let new_commit = Commit {
            commit_id: new_commit_id.clone(),
            repo_id,
            branch: branch.as_str().to_string(),
            parent_commit_id: Some(new_parent.clone()),
            parent2_commit_id: None,
            snapshot_id,
            message: original.message.clone(),
            author: author.to_string(),
            committed_at: None,
            metadata: original.metadata.clone(),
        };
        commits.insert(&new_commit)?;

        new_parent = new_commit_id.clone();
        replayed.push(new_commit_id);
    }

    refs.compare_and_swap(RefCategory::Branch, branch, Some(&tip), Some(&new_parent))?;

    let old_tip_manifest = manifest_of(commits, snapshots, &tip)?;
    let new_tip_manifest = manifest_of(commits, snapshots, &new_parent)?;
    workdir::restore_to_manifest(objects, workdir_root, Some(&old_tip_manifest), &new_tip_manifest)?;

    Ok(RebaseOutcome::Rebased { new_tip: new_parent, replayed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::plumbing_commit_id;
    use crate::commit::Metadata;
    use crate::file_util::create_or_reuse_dir;
    use crate::object_id::ObjectId as _;
    use crate::tests::new_temp_dir;
    use std::collections::BTreeMap;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        objects: ObjectStore,
        snapshots: SnapshotStore,
        commits: CommitStore,
        refs: RefStore,
        merge_state_path: std::path::PathBuf,
        workdir_root: std::path::PathBuf,
        branch: RefName,
    }

    fn fixture() -> Fixture {
        let dir = new_temp_dir();
        let muse_dir = dir.path().join(".muse");
        create_or_reuse_dir(&muse_dir).unwrap();
        let objects_root = muse_dir.join("objects");
        ObjectStore::init(&objects_root).unwrap();
        let snapshots_root = muse_dir.join("snapshots");
        SnapshotStore::init(&snapshots_root).unwrap();
        let commits_root = muse_dir.join("commits");
        CommitStore::init(&commits_root).unwrap();
        RefStore::init(&muse_dir).unwrap();
        let workdir_root = dir.path().join("muse-work");
        create_or_reuse_dir(&workdir_root).unwrap();
        let branch = RefName::new("main").unwrap();
        let refs = RefStore::new(muse_dir.clone());
        refs.set_head_branch(&branch).unwrap();

        Fixture {
            objects: ObjectStore::new(objects_root),
            snapshots: SnapshotStore::new(snapshots_root),
            commits: CommitStore::new(commits_root),
            refs,
            merge_state_path: muse_dir.join("MERGE_STATE.json"),
            workdir_root,
            branch,
            _dir: dir,
        }
    }

    fn commit_with_files(f: &Fixture, branch: &RefName, parent: Option<CommitId>, files: &[(&str, &[u8])]) -> CommitId {
        let entries = files
            .iter()
            .map(|(p, bytes)| (crate::repo_path::RepoPathBuf::new(*p).unwrap(), f.objects.put(bytes).unwrap()))
            .collect::<BTreeMap<_, _>>();
        let manifest = Manifest::from_entries(entries);
        let snapshot_id = manifest.canonical_id();
        f.snapshots.put(&manifest).unwrap();
        let parents: Vec<_> = parent.iter().cloned().collect();
        let commit_id = plumbing_commit_id(&parents, &snapshot_id, "msg", "tester");
        let commit = Commit {
            commit_id: commit_id.clone(),
            repo_id: Uuid::nil(),
            branch: branch.as_str().to_string(),
            parent_commit_id: parent,
            parent2_commit_id: None,
            snapshot_id,
            message: "msg".to_string(),
            author: "tester".to_string(),
            committed_at: None,
            metadata: Metadata::new(),
        };
        f.commits.insert(&commit).unwrap();
        f.refs.write(RefCategory::Branch, branch, &commit_id).unwrap();
        commit_id
    }

    #[test]
    fn rebase_replays_diverged_chain_onto_new_base() {
        let f = fixture();
        let main = RefName::new("main").unwrap();
        let base = commit_with_files(&f, &main, None, &[("a.mid", b"base")]);
        let onto = commit_with_files(&f, &main, Some(base.clone()), &[("a.mid", b"base"), ("shared.mid", b"onto")]);

        let feature = RefName::new("feature").unwrap();
        f.refs.write(RefCategory::Branch, &feature, &base).unwrap();
        let f1 = commit_with_files(&f, &feature, Some(base.clone()), &[("a.mid", b"base"), ("solo.mid", b"1")]);
        let f2 = commit_with_files(&f, &feature, Some(f1.clone()), &[("a.mid", b"base"), ("solo.mid", b"2")]);

        let outcome = rebase(
            &f.objects, &f.snapshots, &f.commits, &f.refs, &f.merge_state_path,
            &f.workdir_root, &feature, Uuid::nil(), onto.clone(), "tester",
        )
        .unwrap();

        let RebaseOutcome::Rebased { new_tip, replayed } = outcome else { panic!("expected Rebased") };
        assert_eq!(replayed.len(), 2);
        assert_ne!(replayed[0], f1);
        assert_ne!(replayed[1], f2);
        assert_eq!(f.refs.read(RefCategory::Branch, &feature).unwrap(), Some(new_tip.clone()));

        let new_tip_manifest = manifest_of(&f.commits, &f.snapshots, &new_tip).unwrap();
        assert!(new_tip_manifest.get(&crate::repo_path::RepoPathBuf::new("shared.mid").unwrap()).is_some());
        assert!(new_tip_manifest.get(&crate::repo_path::RepoPathBuf::new("solo.mid").unwrap()).is_some());

        let replayed_first = f.commits.get(&replayed[0]).unwrap();
        assert_eq!(replayed_first.parent_commit_id, Some(onto));
    }

    #[test]
    fn rebase_onto_same_base_twice_is_idempotent() {
        let f = fixture();
        let main = RefName::new("main").unwrap();
        let base = commit_with_files(&f, &main, None, &[("a.mid", b"base")]);
        let onto = commit_with_files(&f, &main, Some(base.clone()), &[("a.mid", b"base2")]);

        let feature = RefName::new("feature").unwrap();
        f.refs.write(RefCategory::Branch, &feature, &base).unwrap();
        let _f1 = commit_with_files(&f, &feature, Some(base.clone()), &[("a.mid", b"base"), ("solo.mid", b"1")]);

        let first = rebase(
            &f.objects, &f.snapshots, &f.commits, &f.refs, &f.merge_state_path,
            &f.workdir_root, &feature, Uuid::nil(), onto.clone(), "tester",
        )
        .unwrap();
        let RebaseOutcome::Rebased { new_tip: tip1, .. } = first else { panic!("expected Rebased") };

        // Rewind the branch back to the pre-rebase tip and replay again: the
        // resulting chain must be byte-identical (spec §8's idempotence law).
        f.refs.write(RefCategory::Branch, &feature, &_f1).unwrap();
        let second = rebase(
            &f.objects, &f.snapshots, &f.commits, &f.refs, &f.merge_state_path,
            &f.workdir_root, &feature, Uuid::nil(), onto, "tester",
        )
        .unwrap();
        let RebaseOutcome::Rebased { new_tip: tip2, .. } = second else { panic!("expected Rebased") };

        assert_eq!(tip1, tip2);
    }

    #[test]
    fn rebase_onto_ancestor_is_a_no_op() {
        let f = fixture();
        let main = RefName::new("main").unwrap();
        let base = commit_with_files(&f, &main, None, &[("a.mid", b"base")]);
        let tip = commit_with_files(&f, &main, Some(base.clone()), &[("a.mid", b"more")]);

        let outcome = rebase(
            &f.objects, &f.snapshots, &f.commits, &f.refs, &f.merge_state_path,
            &f.workdir_root, &main, Uuid::nil(), base, "tester",
        )
        .unwrap();
        assert_eq!(outcome, RebaseOutcome::NoOp);
        assert_eq!(f.refs.read(RefCategory::Branch, &main).unwrap(), Some(tip));
    }

    #[test]
    fn rebase_fast_forwards_when_tip_is_an_ancestor_of_onto() {
        let f = fixture();
        let main = RefName::new("main").unwrap();
        let base = commit_with_files(&f, &main, None, &[("a.mid", b"base")]);
        let ahead = commit_with_files(&f, &main, Some(base.clone()), &[("a.mid", b"base"), ("b.mid", b"ahead")]);

        let feature = RefName::new("feature").unwrap();
        f.refs.write(RefCategory::Branch, &feature, &base).unwrap();

        let outcome = rebase(
            &f.objects, &f.snapshots, &f.commits, &f.refs, &f.merge_state_path,
            &f.workdir_root, &feature, Uuid::nil(), ahead.clone(), "tester",
        )
        .unwrap();
        assert_eq!(outcome, RebaseOutcome::FastForwarded(ahead.clone()));
        assert_eq!(f.refs.read(RefCategory::Branch, &feature).unwrap(), Some(ahead));
        assert_eq!(fs::read(f.workdir_root.join("b.mid")).unwrap(), b"ahead");
    }

    #[test]
    fn rebase_stops_on_reconflicting_commit() {
        let f = fixture();
        let main = RefName::new("main").unwrap();
        let base = commit_with_files(&f, &main, None, &[("beat.mid", b"base")]);
        let onto = commit_with_files(&f, &main, Some(base.clone()), &[("beat.mid", b"onto-change")]);

        let feature = RefName::new("feature").unwrap();
        f.refs.write(RefCategory::Branch, &feature, &base).unwrap();
        let _f1 = commit_with_files(&f, &feature, Some(base), &[("beat.mid", b"feature-change")]);

        let err = rebase(
            &f.objects, &f.snapshots, &f.commits, &f.refs, &f.merge_state_path,
            &f.workdir_root, &feature, Uuid::nil(), onto, "tester",
        )
        .unwrap_err();
        assert!(matches!(err, MuseError::UserError(_)));
        // the branch ref must be untouched by the aborted rebase
        assert_eq!(f.refs.read(RefCategory::Branch, &feature).unwrap(), Some(_f1));
    }

    #[test]
    fn rebase_rejects_merge_commit_in_the_chain() {
        let f = fixture();
        let main = RefName::new("main").unwrap();
        let base = commit_with_files(&f, &main, None, &[("a.mid", b"1")]);
        let onto = commit_with_files(&f, &main, Some(base.clone()), &[("a.mid", b"2")]);

        let feature = RefName::new("feature").unwrap();
        f.refs.write(RefCategory::Branch, &feature, &base).unwrap();
        let side = commit_with_files(&f, &feature, Some(base.clone()), &[("a.mid", b"1"), ("side.mid", b"x")]);

        // Hand-build a merge commit with two parents directly onto `feature`.
        let manifest = Manifest::from_entries(BTreeMap::from([(
            crate::repo_path::RepoPathBuf::new("a.mid").unwrap(),
            f.objects.put(b"1").unwrap(),
        )]));
        let snapshot_id = manifest.canonical_id();
        f.snapshots.put(&manifest).unwrap();
        let merge_id = plumbing_commit_id(&[base.clone(), side.clone()], &snapshot_id, "merge", "tester");
        let merge_commit = Commit {
            commit_id: merge_id.clone(),
            repo_id: Uuid::nil(),
            branch: feature.as_str().to_string(),
            parent_commit_id: Some(base),
            parent2_commit_id: Some(side),
            snapshot_id,
            message: "merge".to_string(),
            author: "tester".to_string(),
            committed_at: None,
            metadata: Metadata::new(),
        };
        f.commits.insert(&merge_commit).unwrap();
        f.refs.write(RefCategory::Branch, &feature, &merge_id).unwrap();

        let err = rebase(
            &f.objects, &f.snapshots, &f.commits, &f.refs, &f.merge_state_path,
            &f.workdir_root, &feature, Uuid::nil(), onto, "tester",
        )
        .unwrap_err();
        assert!(matches!(err, MuseError::UserError(_)));
    }
}
