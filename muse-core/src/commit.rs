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

//! Commit DAG node (spec §3's "Commit", §4.3).
//!
//! Distilled from `jj-lib`'s `commit.rs`/`backend.rs` commit types: the
//! wrapper-around-a-plain-data-struct shape is kept, generalized to spec's
//! two-parent (not n-ary) DAG and its extensible JSON metadata map, and with
//! jj's change-id/predecessors/signing fields dropped (spec has no rewrite
//! tracking or signing model).

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::content_hash::sha256_str;
use crate::object_id::CommitId;
use crate::object_id::ObjectId as _;
use crate::object_id::SnapshotId;

const FIELD_SEP: &str = "|";
const PARENT_SEP: &str = "|";

/// Open-ended commit annotation map (spec §3, §9): `tempo_bpm`, `section`,
/// `emotion`, and any future domain key. Serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata(BTreeMap<String, serde_json::Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Typed accessor: `metadata.tempo_bpm()`.
    pub fn tempo_bpm(&self) -> Option<f64> {
        self.0.get("tempo_bpm").and_then(serde_json::Value::as_f64)
    }

    pub fn section(&self) -> Option<&str> {
        self.0.get("section").and_then(serde_json::Value::as_str)
    }

    pub fn emotion(&self) -> Option<&str> {
        self.0.get("emotion").and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub commit_id: CommitId,
    pub repo_id: Uuid,
    pub branch: String,
    pub parent_commit_id: Option<CommitId>,
    pub parent2_commit_id: Option<CommitId>,
    pub snapshot_id: SnapshotId,
    pub message: String,
    pub author: String,
    /// `None` for plumbing commits (spec §3, §4.3).
    pub committed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Commit {
    /// Parent IDs in DAG order (parent1, then parent2 if present), for
    /// walks and display. Hashing always uses [`sorted_parent_ids`]
    /// instead, since the hash must not depend on argument order.
    pub fn parent_ids(&self) -> Vec<CommitId> {
        self.parent_commit_id
            .iter()
            .chain(self.parent2_commit_id.iter())
            .cloned()
            .collect()
    }

    pub fn is_merge(&self) -> bool {
        self.parent2_commit_id.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.parent_commit_id.is_none() && self.parent2_commit_id.is_none()
    }
}

fn sorted_parent_ids(parents: &[CommitId]) -> Vec<CommitId> {
    let mut sorted = parents.to_vec();
    sorted.sort();
    sorted
}

fn join_parent_ids(parents: &[CommitId]) -> String {
    sorted_parent_ids(parents)
        .iter()
        .map(CommitId::hex)
        .collect::<Vec<_>>()
        .join(PARENT_SEP)
}

/// Derives a *timestamped* commit id (spec §4.3): used for user-visible
/// `commit`/`amend` so that re-committing identical content at a different
/// moment produces a new history node.
///
/// `SHA256(join(sorted(parent_ids), "|") | snapshot_id | message | timestamp_iso)`
pub fn timestamped_commit_id(
    parents: &[CommitId],
    snapshot_id: &SnapshotId,
    message: &str,
    timestamp: DateTime<Utc>,
) -> CommitId {
    let rendered = [
        join_parent_ids(parents),
        snapshot_id.hex(),
        message.to_string(),
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    ]
    .join(FIELD_SEP);
    CommitId::new(sha256_str(&rendered))
}

/// Derives a *plumbing* commit id (spec §4.3): used for raw commit creation
/// and rebase replay. Deliberately excludes the timestamp so identical
/// inputs always produce the same id (idempotent insert).
///
/// `SHA256(join(sorted(parent_ids), "|") | snapshot_id | message | author)`
pub fn plumbing_commit_id(
    parents: &[CommitId],
    snapshot_id: &SnapshotId,
    message: &str,
    author: &str,
) -> CommitId {
    let rendered = [
        join_parent_ids(parents),
        snapshot_id.hex(),
        message.to_string(),
        author.to_string(),
    ]
    .join(FIELD_SEP);
    CommitId::new(sha256_str(&rendered))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(b: u8) -> CommitId {
        CommitId::new(vec![b; 32])
    }

    fn sid() -> SnapshotId {
        SnapshotId::new(vec![0xAB; 32])
    }

    #[test]
    fn timestamped_id_ignores_parent_argument_order() {
        let t = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let a = timestamped_commit_id(&[cid(1), cid(2)], &sid(), "msg", t);
        let b = timestamped_commit_id(&[cid(2), cid(1)], &sid(), "msg", t);
        assert_eq!(a, b);
    }

    #[test]
    fn timestamped_id_changes_with_timestamp() {
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::seconds(1);
        let a = timestamped_commit_id(&[], &sid(), "msg", t1);
        let b = timestamped_commit_id(&[], &sid(), "msg", t2);
        assert_ne!(a, b);
    }

    #[test]
    fn plumbing_id_is_deterministic_across_calls() {
        let a = plumbing_commit_id(&[cid(1)], &sid(), "msg", "alice");
        let b = plumbing_commit_id(&[cid(1)], &sid(), "msg", "alice");
        assert_eq!(a, b);
    }

    #[test]
    fn plumbing_id_changes_with_author_not_timestamp() {
        let a = plumbing_commit_id(&[], &sid(), "msg", "alice");
        let b = plumbing_commit_id(&[], &sid(), "msg", "bob");
        assert_ne!(a, b);
    }
}
