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

//! Tempo detection (spec §4.10): explicit `tempo_bpm` metadata first, then
//! a scan of MIDI files in the commit's snapshot for a Set Tempo
//! meta-event (`FF 51 03 tt tt tt`).

use crate::commit::Commit;
use crate::commit_store::CommitStore;
use crate::error::MuseResult;
use crate::object_id::CommitId;
use crate::object_store::ObjectStore;
use crate::snapshot::SnapshotStore;

const SET_TEMPO_META_EVENT: [u8; 3] = [0xFF, 0x51, 0x03];
const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// Scans raw MIDI bytes for the first Set Tempo meta-event and converts its
/// microseconds-per-quarter-note payload to BPM.
fn scan_midi_tempo(bytes: &[u8]) -> Option<f64> {
    bytes.windows(6).find_map(|window| {
        if window[0] != SET_TEMPO_META_EVENT[0]
            || window[1] != SET_TEMPO_META_EVENT[1]
            || window[2] != SET_TEMPO_META_EVENT[2]
        {
            return None;
        }
        let micros_per_beat = u32::from_be_bytes([0, window[3], window[4], window[5]]);
        (micros_per_beat > 0).then(|| MICROS_PER_MINUTE / f64::from(micros_per_beat))
    })
}

fn is_midi_path(path: &crate::repo_path::RepoPathBuf) -> bool {
    let lower = path.as_str().to_ascii_lowercase();
    lower.ends_with(".mid") || lower.ends_with(".midi")
}

/// Effective tempo for `commit`: explicit metadata wins; otherwise the
/// first Set Tempo event found scanning its MIDI files in path order.
pub fn effective_tempo(objects: &ObjectStore, snapshots: &SnapshotStore, commit: &Commit) -> MuseResult<Option<f64>> {
    if let Some(bpm) = commit.metadata.tempo_bpm() {
        return Ok(Some(bpm));
    }

    let manifest = snapshots.get(&commit.snapshot_id)?;
    let mut midi_paths: Vec<_> = manifest.paths().filter(|path| is_midi_path(path)).collect();
    midi_paths.sort();

    for path in midi_paths {
        let hash = manifest.get(path).expect("path came from this manifest");
        let bytes = objects.get(hash)?;
        if let Some(bpm) = scan_midi_tempo(&bytes) {
            return Ok(Some(bpm));
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TempoPoint {
    pub commit_id: CommitId,
    pub bpm: Option<f64>,
    pub delta_vs_ancestor: Option<f64>,
}

/// Walks the first-parent chain from `start` (newest first) annotating
/// each commit with its effective tempo and delta vs its immediate
/// ancestor.
pub fn tempo_history(
    objects: &ObjectStore,
    snapshots: &SnapshotStore,
    commits: &CommitStore,
    start: &CommitId,
    limit: Option<usize>,
) -> MuseResult<Vec<TempoPoint>> {
    let chain = commits.walk_first_parent(start, limit)?;
    let mut points = Vec::with_capacity(chain.len());
    for (index, commit) in chain.iter().enumerate() {
        let bpm = effective_tempo(objects, snapshots, commit)?;
        let delta_vs_ancestor = match chain.get(index + 1) {
            Some(ancestor) => {
                let ancestor_bpm = effective_tempo(objects, snapshots, ancestor)?;
                bpm.zip(ancestor_bpm).map(|(current, previous)| current - previous)
            }
            None => None,
        };
        points.push(TempoPoint { commit_id: commit.commit_id.clone(), bpm, delta_vs_ancestor });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::plumbing_commit_id;
    use crate::commit::Commit;
    use crate::commit::Metadata;
    use crate::snapshot::Manifest;
    use crate::tests::new_temp_dir;
    use std::collections::BTreeMap;

    fn midi_with_tempo(bpm: f64) -> Vec<u8> {
        let micros = (60_000_000.0 / bpm).round() as u32;
        let bytes = micros.to_be_bytes();
        let mut data = vec![0x4D, 0x54, 0x68, 0x64];
        data.extend(SET_TEMPO_META_EVENT);
        data.extend(&bytes[1..]);
        data
    }

    #[test]
    fn explicit_metadata_wins_over_midi_scan() {
        let dir = new_temp_dir();
        let objects_root = dir.path().join("objects");
        ObjectStore::init(&objects_root).unwrap();
        let objects = ObjectStore::new(objects_root);
        let snapshots_root = dir.path().join("snapshots");
        SnapshotStore::init(&snapshots_root).unwrap();
        let snapshots = SnapshotStore::new(snapshots_root);

        let manifest = Manifest::default();
        snapshots.put(&manifest).unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("tempo_bpm", serde_json::json!(140.0));
        let commit = Commit {
            commit_id: plumbing_commit_id(&[], &manifest.canonical_id(), "m", "t"),
            repo_id: uuid::Uuid::nil(),
            branch: String::new(),
            parent_commit_id: None,
            parent2_commit_id: None,
            snapshot_id: manifest.canonical_id(),
            message: "m".to_string(),
            author: "t".to_string(),
            committed_at: None,
            metadata,
        };
        assert_eq!(effective_tempo(&objects, &snapshots, &commit).unwrap(), Some(140.0));
    }

    #[test]
    fn scans_midi_bytes_for_set_tempo_event() {
        let dir = new_temp_dir();
        let objects_root = dir.path().join("objects");
        ObjectStore::init(&objects_root).unwrap();
        let objects = ObjectStore::new(objects_root);
        let snapshots_root = dir.path().join("snapshots");
        SnapshotStore::init(&snapshots_root).unwrap();
        let snapshots = SnapshotStore::new(snapshots_root);

        let hash = objects.put(&midi_with_tempo(120.0)).unwrap();
        let manifest = Manifest::from_entries(BTreeMap::from([(
            crate::repo_path::RepoPathBuf::new("song.mid").unwrap(),
            hash,
        )]));
        snapshots.put(&manifest).unwrap();
        let commit = Commit {
            commit_id: plumbing_commit_id(&[], &manifest.canonical_id(), "m", "t"),
            repo_id: uuid::Uuid::nil(),
            branch: String::new(),
            parent_commit_id: None,
            parent2_commit_id: None,
            snapshot_id: manifest.canonical_id(),
            message: "m".to_string(),
            author: "t".to_string(),
            committed_at: None,
            metadata: Metadata::new(),
        };
        let bpm = effective_tempo(&objects, &snapshots, &commit).unwrap().unwrap();
        assert!((bpm - 120.0).abs() < 0.5);
    }

    #[test]
    fn no_metadata_and_no_midi_is_none() {
        let dir = new_temp_dir();
        let objects_root = dir.path().join("objects");
        ObjectStore::init(&objects_root).unwrap();
        let objects = ObjectStore::new(objects_root);
        let snapshots_root = dir.path().join("snapshots");
        SnapshotStore::init(&snapshots_root).unwrap();
        let snapshots = SnapshotStore::new(snapshots_root);

        let manifest = Manifest::default();
        snapshots.put(&manifest).unwrap();
        let commit = Commit {
            commit_id: plumbing_commit_id(&[], &manifest.canonical_id(), "m", "t"),
            repo_id: uuid::Uuid::nil(),
            branch: String::new(),
            parent_commit_id: None,
            parent2_commit_id: None,
            snapshot_id: manifest.canonical_id(),
            message: "m".to_string(),
            author: "t".to_string(),
            committed_at: None,
            metadata: Metadata::new(),
        };
        assert_eq!(effective_tempo(&objects, &snapshots, &commit).unwrap(), None);
    }
}
