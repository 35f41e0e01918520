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

//! The query layer (spec §4.11): utility operations spanning the stores —
//! filtered history walks, branch listing, batched tag lookups, working-tree
//! status, and the `grep` service (SPEC_FULL.md §11.2).

use std::collections::BTreeSet;

use chrono::DateTime;
use chrono::Utc;
use regex::Regex;

use crate::commit::Commit;
use crate::commit_store::CommitStore;
use crate::error::MuseResult;
use crate::object_id::CommitId;
use crate::refs::Head;
use crate::refs::RefCategory;
use crate::refs::RefName;
use crate::refs::RefStore;
use crate::snapshot::SnapshotStore;
use crate::tags::TagIndex;
use crate::workdir::diff as workdir_diff;
use crate::workdir::WorkdirDiff;

/// Filters applied while walking history (spec §4.11): all fields are
/// optional and conjunctive (a commit must satisfy every set field).
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub author_substring: Option<String>,
    /// Matches if the commit carries at least one tag starting with this
    /// prefix (e.g. `"emotion:"`), via a single batched tag lookup.
    pub tag_prefix: Option<String>,
}

fn commit_matches(commit: &Commit, tags: &BTreeSet<String>, filter: &HistoryFilter) -> bool {
    if let Some(since) = filter.since {
        if commit.committed_at.is_none_or(|t| t < since) {
            return false;
        }
    }
    if let Some(until) = filter.until {
        if commit.committed_at.is_none_or(|t| t > until) {
            return false;
        }
    }
    if let Some(needle) = &filter.author_substring {
        if !commit.author.contains(needle.as_str()) {
            return false;
        }
    }
    if let Some(prefix) = &filter.tag_prefix {
        if !tags.iter().any(|tag| tag.starts_with(prefix.as_str())) {
            return false;
        }
    }
    true
}

/// Walks the first-parent chain from `start`, applying `filter`, and returns
/// at most `limit` *matching* commits, newest first (spec §4.3's ordering,
/// spec §4.11's filtered walk). `limit` bounds the walk itself when no
/// filter can possibly reject anything, but in general the underlying chain
/// is walked to completion (or until `limit` matches are found) since an
/// early filtered-out commit must not count against the caller's limit.
pub fn walk_history(
    commits: &CommitStore,
    tags: &TagIndex,
    start: &CommitId,
    limit: Option<usize>,
    filter: &HistoryFilter,
) -> MuseResult<Vec<Commit>> {
    let mut result = Vec::new();
    let mut current = Some(start.clone());
    while let Some(id) = current {
        if let Some(limit) = limit {
            if result.len() >= limit {
                break;
            }
        }
        let commit = commits.get(&id)?;
        current = commit.parent_commit_id.clone();
        let commit_tags = tags.tags_for(&commit.commit_id)?;
        if commit_matches(&commit, &commit_tags, filter) {
            result.push(commit);
        }
    }
    Ok(result)
}

/// Every branch and its tip commit, sorted by name (spec §4.11: "resolve
/// branches from the ref store"). Thin pass-through kept here, rather than
/// inlined at call sites, so callers needing both history and branch
/// listings only depend on this module.
pub fn branches(refs: &RefStore) -> MuseResult<Vec<(RefName, CommitId)>> {
    refs.list(RefCategory::Branch)
}

/// Working-tree status: the current branch (if any) and its diff against
/// `HEAD`'s snapshot (spec §4.11's "compute status").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub branch: Option<RefName>,
    pub diff: WorkdirDiff,
}

pub fn status(
    commits: &CommitStore,
    snapshots: &SnapshotStore,
    refs: &RefStore,
    workdir_root: &std::path::Path,
) -> MuseResult<Status> {
    let branch = match refs.read_head()? {
        Head::Branch(name) => Some(name),
        Head::Detached(_) => None,
    };
    let head_manifest = match refs.resolve_head()? {
        Some(commit_id) => {
            let commit = commits.get(&commit_id)?;
            snapshots.get(&commit.snapshot_id)?
        }
        None => crate::snapshot::Manifest::default(),
    };
    let diff = workdir_diff(workdir_root, &head_manifest)?;
    Ok(Status { branch, diff })
}

/// One `grep` hit (SPEC_FULL.md §11.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepMatch {
    pub commit_id: CommitId,
    pub message: String,
    pub branch: String,
}

/// Searches commit messages and branch labels for `pattern` (SPEC_FULL.md
/// §11.2). `all_branches` walks every stored commit (in commit-id order);
/// otherwise only the first-parent chain from `start` is searched.
pub fn grep(
    commits: &CommitStore,
    pattern: &Regex,
    start: Option<&CommitId>,
    all_branches: bool,
) -> MuseResult<Vec<GrepMatch>> {
    let candidates: Vec<Commit> = if all_branches {
        let mut ids = commits.all_ids()?;
        ids.sort();
        ids.iter().map(|id| commits.get(id)).collect::<MuseResult<_>>()?
    } else {
        let start = start.expect("start is required unless all_branches is set");
        commits.walk_first_parent(start, None)?
    };

    Ok(candidates
        .into_iter()
        .filter(|commit| pattern.is_match(&commit.message) || pattern.is_match(&commit.branch))
        .map(|commit| GrepMatch { commit_id: commit.commit_id, message: commit.message, branch: commit.branch })
        .collect())
}

/// `grep`'s `--commits`/`ids_only` mode (SPEC_FULL.md §11.2): just the
/// matching commit ids, for scripting.
pub fn grep_ids(
    commits: &CommitStore,
    pattern: &Regex,
    start: Option<&CommitId>,
    all_branches: bool,
) -> MuseResult<Vec<CommitId>> {
    Ok(grep(commits, pattern, start, all_branches)?.into_iter().map(|m| m.commit_id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::plumbing_commit_id;
    use crate::commit::Metadata;
    use crate::object_id::SnapshotId;
    use crate::tests::new_temp_dir;

    struct Fixture {
        commits: CommitStore,
        tags: TagIndex,
    }

    fn fixture() -> (tempfile::TempDir, Fixture) {
        let dir = new_temp_dir();
        let commits_root = dir.path().join("commits");
        CommitStore::init(&commits_root).unwrap();
        let tags_path = dir.path().join("tags.json");
        TagIndex::init(&tags_path).unwrap();
        (dir, Fixture { commits: CommitStore::new(commits_root), tags: TagIndex::new(tags_path) })
    }

    fn store_commit(f: &Fixture, parent: Option<CommitId>, branch: &str, message: &str, author: &str) -> CommitId {
        let snapshot_id = SnapshotId::new(vec![0xEE; 32]);
        let parents: Vec<_> = parent.iter().cloned().collect();
        let commit_id = plumbing_commit_id(&parents, &snapshot_id, message, author);
        let commit = Commit {
            commit_id: commit_id.clone(),
            repo_id: uuid::Uuid::nil(),
            branch: branch.to_string(),
            parent_commit_id: parent,
            parent2_commit_id: None,
            snapshot_id,
            message: message.to_string(),
            author: author.to_string(),
            committed_at: None,
            metadata: Metadata::new(),
        };
        f.commits.insert(&commit).unwrap();
        commit_id
    }

    #[test]
    fn walk_history_filters_by_author_substring() {
        let (_dir, f) = fixture();
        let c1 = store_commit(&f, None, "main", "root", "alice");
        let c2 = store_commit(&f, Some(c1), "main", "second", "bob");

        let filter = HistoryFilter { author_substring: Some("bob".to_string()), ..Default::default() };
        let matched = walk_history(&f.commits, &f.tags, &c2, None, &filter).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].commit_id, c2);
    }

    #[test]
    fn walk_history_filters_by_tag_prefix() {
        let (_dir, f) = fixture();
        let c1 = store_commit(&f, None, "main", "root", "alice");
        let c2 = store_commit(&f, Some(c1.clone()), "main", "second", "alice");
        f.tags.add(&c2, "emotion:joyful").unwrap();

        let filter = HistoryFilter { tag_prefix: Some("emotion:".to_string()), ..Default::default() };
        let matched = walk_history(&f.commits, &f.tags, &c2, None, &filter).unwrap();
        assert_eq!(matched, vec![f.commits.get(&c2).unwrap()]);
    }

    #[test]
    fn walk_history_limit_counts_matches_not_steps() {
        let (_dir, f) = fixture();
        let c1 = store_commit(&f, None, "main", "root", "alice");
        let c2 = store_commit(&f, Some(c1), "main", "skip-me", "bob");
        let c3 = store_commit(&f, Some(c2), "main", "keep-me", "alice");

        let filter = HistoryFilter { author_substring: Some("alice".to_string()), ..Default::default() };
        let matched = walk_history(&f.commits, &f.tags, &c3, Some(1), &filter).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].commit_id, c3);
    }

    #[test]
    fn grep_matches_message_or_branch() {
        let (_dir, f) = fixture();
        let c1 = store_commit(&f, None, "main", "fix the bassline", "alice");
        let c2 = store_commit(&f, Some(c1), "chorus-rework", "unrelated", "alice");

        let pattern = Regex::new("bass|chorus").unwrap();
        let mut matches = grep(&f.commits, &pattern, Some(&c2), false).unwrap();
        matches.sort_by(|a, b| a.commit_id.cmp(&b.commit_id));
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn grep_ids_only_returns_bare_ids() {
        let (_dir, f) = fixture();
        let c1 = store_commit(&f, None, "main", "melancholic bridge", "alice");
        let pattern = Regex::new("melancholic").unwrap();
        assert_eq!(grep_ids(&f.commits, &pattern, Some(&c1), false).unwrap(), vec![c1]);
    }

    #[test]
    fn grep_all_branches_searches_every_stored_commit() {
        let (_dir, f) = fixture();
        let a = store_commit(&f, None, "main", "alpha", "alice");
        let b = store_commit(&f, None, "feature", "beta", "bob");
        let pattern = Regex::new("alpha|beta").unwrap();
        let mut ids = grep_ids(&f.commits, &pattern, None, true).unwrap();
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
