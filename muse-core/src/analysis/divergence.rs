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

//! Branch divergence (spec §4.10): classifies the symmetric difference
//! between two branch tips' manifests into musical dimensions by path
//! keyword, and scores each dimension by how much of its footprint changed.

use std::collections::BTreeSet;

use crate::commit_store::CommitStore;
use crate::error::MuseResult;
use crate::merge;
use crate::object_id::CommitId;
use crate::repo_path::RepoPathBuf;
use crate::snapshot::Manifest;
use crate::snapshot::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DivergenceLevel {
    None,
    Low,
    Med,
    High,
}

impl DivergenceLevel {
    /// Quantizes a `[0.0, 1.0]` score into a bucket. The four thresholds
    /// mark bucket floors; `0.0` itself is the `None` floor rather than a
    /// fifth bucket boundary.
    fn from_score(score: f64) -> Self {
        if score < 0.15 {
            Self::None
        } else if score < 0.40 {
            Self::Low
        } else if score < 0.70 {
            Self::Med
        } else {
            Self::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicalDimension {
    Melody,
    Chords,
    Drums,
    Structure,
    Mix,
}

const DIMENSIONS: [(MusicalDimension, &[&str]); 5] = [
    (MusicalDimension::Melody, &["melody", "lead", "vocal", "solo"]),
    (MusicalDimension::Chords, &["chord", "harmony", "key"]),
    (MusicalDimension::Drums, &["drum", "percussion", "beat", "groove"]),
    (MusicalDimension::Structure, &["chorus", "verse", "bridge", "section", "intro", "outro"]),
    (MusicalDimension::Mix, &["mix", "master", "level"]),
];

fn matches_dimension(path: &RepoPathBuf, keywords: &[&str]) -> bool {
    let lower = path.as_str().to_ascii_lowercase();
    keywords.iter().any(|keyword| lower.contains(keyword))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionDivergence {
    pub dimension: MusicalDimension,
    pub score: f64,
    pub level: DivergenceLevel,
    pub changed_paths: Vec<RepoPathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DivergenceReport {
    pub common_ancestor: Option<CommitId>,
    pub dimensions: Vec<DimensionDivergence>,
}

fn symmetric_difference(a: &Manifest, b: &Manifest) -> BTreeSet<RepoPathBuf> {
    let mut paths = BTreeSet::new();
    for path in a.paths().chain(b.paths()) {
        if a.get(path) != b.get(path) {
            paths.insert(path.clone());
        }
    }
    paths
}

fn union_paths(a: &Manifest, b: &Manifest) -> BTreeSet<RepoPathBuf> {
    a.paths().chain(b.paths()).cloned().collect()
}

/// Scores divergence between two branch tips across the five musical
/// dimensions (spec §4.10). `ancestor` overrides the auto-detected common
/// ancestor; when `None`, [`merge::merge_base`] resolves it.
pub fn divergence(
    commits: &CommitStore,
    snapshots: &SnapshotStore,
    a: &CommitId,
    b: &CommitId,
    ancestor: Option<&CommitId>,
) -> MuseResult<DivergenceReport> {
    let common_ancestor = match ancestor {
        Some(id) => Some(id.clone()),
        None => merge::merge_base(commits, a, b)?,
    };

    let manifest_a = snapshots.get(&commits.get(a)?.snapshot_id)?;
    let manifest_b = snapshots.get(&commits.get(b)?.snapshot_id)?;

    let changed = symmetric_difference(&manifest_a, &manifest_b);
    let union = union_paths(&manifest_a, &manifest_b);

    let mut dimensions = Vec::with_capacity(DIMENSIONS.len());
    for (dimension, keywords) in DIMENSIONS {
        let dimension_union: Vec<_> = union.iter().filter(|path| matches_dimension(path, keywords)).collect();
        let dimension_changed: Vec<_> = changed.iter().filter(|path| matches_dimension(path, keywords)).cloned().collect();

        let score = if dimension_union.is_empty() {
            0.0
        } else {
            dimension_changed.len() as f64 / dimension_union.len() as f64
        };

        dimensions.push(DimensionDivergence {
            dimension,
            score,
            level: DivergenceLevel::from_score(score),
            changed_paths: dimension_changed,
        });
    }

    Ok(DivergenceReport { common_ancestor, dimensions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::plumbing_commit_id;
    use crate::commit::Commit;
    use crate::commit::Metadata;
    use crate::object_id::ObjectHash;
    use crate::tests::new_temp_dir;
    use std::collections::BTreeMap;

    struct Fixture {
        commits: CommitStore,
        snapshots: SnapshotStore,
    }

    fn fixture() -> (tempfile::TempDir, Fixture) {
        let dir = new_temp_dir();
        let commits_root = dir.path().join("commits");
        CommitStore::init(&commits_root).unwrap();
        let snapshots_root = dir.path().join("snapshots");
        SnapshotStore::init(&snapshots_root).unwrap();
        let fixture = Fixture {
            commits: CommitStore::new(commits_root),
            snapshots: SnapshotStore::new(snapshots_root),
        };
        (dir, fixture)
    }

    fn commit(f: &Fixture, parent: Option<CommitId>, manifest: Manifest) -> CommitId {
        let snapshot_id = f.snapshots.put(&manifest).unwrap();
        let parents: Vec<_> = parent.iter().cloned().collect();
        let commit_id = plumbing_commit_id(&parents, &snapshot_id, "msg", "tester");
        let commit = Commit {
            commit_id: commit_id.clone(),
            repo_id: uuid::Uuid::nil(),
            branch: String::new(),
            parent_commit_id: parent,
            parent2_commit_id: None,
            snapshot_id,
            message: "msg".to_string(),
            author: "tester".to_string(),
            committed_at: None,
            metadata: Metadata::new(),
        };
        f.commits.insert(&commit).unwrap();
        commit_id
    }

    fn manifest(pairs: &[(&str, u8)]) -> Manifest {
        let entries = pairs
            .iter()
            .map(|(p, b)| (RepoPathBuf::new(*p).unwrap(), ObjectHash::new(vec![*b; 32])))
            .collect::<BTreeMap<_, _>>();
        Manifest::from_entries(entries)
    }

    #[test]
    fn diverging_drum_files_score_high_on_drums_dimension() {
        let (_dir, f) = fixture();
        let base = commit(&f, None, manifest(&[("drums.mid", 1), ("melody.mid", 1)]));
        let a = commit(&f, Some(base.clone()), manifest(&[("drums.mid", 2), ("melody.mid", 1)]));
        let b = commit(&f, Some(base), manifest(&[("drums.mid", 3), ("melody.mid", 1)]));

        let report = divergence(&f.commits, &f.snapshots, &a, &b, None).unwrap();
        let drums = report.dimensions.iter().find(|d| d.dimension == MusicalDimension::Drums).unwrap();
        assert_eq!(drums.level, DivergenceLevel::High);
        let melody = report.dimensions.iter().find(|d| d.dimension == MusicalDimension::Melody).unwrap();
        assert_eq!(melody.level, DivergenceLevel::None);
    }

    #[test]
    fn identical_tips_have_no_divergence_in_any_dimension() {
        let (_dir, f) = fixture();
        let base = commit(&f, None, manifest(&[("chorus.mid", 1)]));
        let a = commit(&f, Some(base.clone()), manifest(&[("chorus.mid", 2)]));
        let b = a.clone();

        let report = divergence(&f.commits, &f.snapshots, &a, &b, None).unwrap();
        assert!(report.dimensions.iter().all(|d| d.level == DivergenceLevel::None));
    }

    #[test]
    fn explicit_ancestor_override_is_used_instead_of_auto_detection() {
        let (_dir, f) = fixture();
        let base = commit(&f, None, manifest(&[("mix.wav", 1)]));
        let a = commit(&f, Some(base.clone()), manifest(&[("mix.wav", 2)]));

        let report = divergence(&f.commits, &f.snapshots, &a, &base, Some(&base)).unwrap();
        assert_eq!(report.common_ancestor, Some(base));
    }
}
