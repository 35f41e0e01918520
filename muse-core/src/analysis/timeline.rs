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

//! Timeline (spec §4.10): the parent chain of a commit, oldest first,
//! enriched with emotion/section/track tags, plus the emotion and section
//! arcs (unique values in order of first appearance).

use crate::commit_store::CommitStore;
use crate::error::MuseResult;
use crate::object_id::CommitId;
use crate::tags::TagIndex;

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub commit_id: CommitId,
    pub message: String,
    pub emotion: Option<String>,
    pub section: Option<String>,
    pub track: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub emotion_arc: Vec<String>,
    pub section_order: Vec<String>,
}

const EMOTION_TAG_PREFIX: &str = "emotion:";
const SECTION_TAG_PREFIX: &str = "section:";
const TRACK_TAG_PREFIX: &str = "track:";

fn first_tag_value<'a>(tags: &'a std::collections::BTreeSet<String>, prefix: &str) -> Option<&'a str> {
    tags.iter().find_map(|tag| tag.strip_prefix(prefix))
}

/// Builds the timeline for `start`'s ancestry, oldest first (spec §4.10).
pub fn timeline(commits: &CommitStore, tags: &TagIndex, start: &CommitId, limit: Option<usize>) -> MuseResult<Timeline> {
    let mut chain = commits.walk_first_parent(start, limit)?;
    chain.reverse();

    let commit_ids: Vec<_> = chain.iter().map(|commit| commit.commit_id.clone()).collect();
    let tags_by_commit = tags.tags_for_many(&commit_ids)?;

    let mut entries = Vec::with_capacity(chain.len());
    let mut emotion_arc = Vec::new();
    let mut section_order = Vec::new();

    for commit in &chain {
        let commit_tags = &tags_by_commit[&commit.commit_id];
        let emotion = first_tag_value(commit_tags, EMOTION_TAG_PREFIX)
            .map(str::to_string)
            .or_else(|| commit.metadata.emotion().map(str::to_string));
        let section = first_tag_value(commit_tags, SECTION_TAG_PREFIX)
            .map(str::to_string)
            .or_else(|| commit.metadata.section().map(str::to_string));
        let track = first_tag_value(commit_tags, TRACK_TAG_PREFIX).map(str::to_string);

        if let Some(emotion) = &emotion {
            if !emotion_arc.contains(emotion) {
                emotion_arc.push(emotion.clone());
            }
        }
        if let Some(section) = &section {
            if !section_order.contains(section) {
                section_order.push(section.clone());
            }
        }

        entries.push(TimelineEntry {
            commit_id: commit.commit_id.clone(),
            message: commit.message.clone(),
            emotion,
            section,
            track,
        });
    }

    Ok(Timeline { entries, emotion_arc, section_order })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::plumbing_commit_id;
    use crate::commit::Commit;
    use crate::commit::Metadata;
    use crate::object_id::SnapshotId;
    use crate::tests::new_temp_dir;

    fn store_commit(store: &CommitStore, parent: Option<CommitId>, message: &str) -> CommitId {
        let snapshot_id = SnapshotId::new(vec![0xCD; 32]);
        let parents: Vec<_> = parent.iter().cloned().collect();
        let commit_id = plumbing_commit_id(&parents, &snapshot_id, message, "tester");
        let commit = Commit {
            commit_id: commit_id.clone(),
            repo_id: uuid::Uuid::nil(),
            branch: String::new(),
            parent_commit_id: parent,
            parent2_commit_id: None,
            snapshot_id,
            message: message.to_string(),
            author: "tester".to_string(),
            committed_at: None,
            metadata: Metadata::new(),
        };
        store.insert(&commit).unwrap();
        commit_id
    }

    #[test]
    fn emotion_and_section_arcs_are_ordered_by_first_appearance() {
        let dir = new_temp_dir();
        let commits_root = dir.path().join("commits");
        CommitStore::init(&commits_root).unwrap();
        let commits = CommitStore::new(commits_root);
        let tags_path = dir.path().join("tags.json");
        TagIndex::init(&tags_path).unwrap();
        let tags = TagIndex::new(tags_path);

        let c1 = store_commit(&commits, None, "intro");
        let c2 = store_commit(&commits, Some(c1.clone()), "verse");
        let c3 = store_commit(&commits, Some(c2.clone()), "chorus");

        tags.add(&c1, "emotion:calm").unwrap();
        tags.add(&c1, "section:intro").unwrap();
        tags.add(&c2, "section:verse").unwrap();
        tags.add(&c3, "emotion:joyful").unwrap();
        tags.add(&c3, "section:chorus").unwrap();

        let result = timeline(&commits, &tags, &c3, None).unwrap();
        assert_eq!(result.entries.len(), 3);
        assert_eq!(result.entries[0].commit_id, c1);
        assert_eq!(result.entries[2].commit_id, c3);
        assert_eq!(result.emotion_arc, vec!["calm", "joyful"]);
        assert_eq!(result.section_order, vec!["intro", "verse", "chorus"]);
    }

    #[test]
    fn entries_carry_track_tags() {
        let dir = new_temp_dir();
        let commits_root = dir.path().join("commits");
        CommitStore::init(&commits_root).unwrap();
        let commits = CommitStore::new(commits_root);
        let tags_path = dir.path().join("tags.json");
        TagIndex::init(&tags_path).unwrap();
        let tags = TagIndex::new(tags_path);

        let c1 = store_commit(&commits, None, "lay down bass");
        tags.add(&c1, "track:bass").unwrap();

        let result = timeline(&commits, &tags, &c1, None).unwrap();
        assert_eq!(result.entries[0].track, Some("bass".to_string()));
    }
}
