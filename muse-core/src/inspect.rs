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

//! Graph export (SPEC_FULL.md §11.1): the reachable commit DAG from a set of
//! branch tips, rendered as structured JSON, Graphviz DOT, or Mermaid.

use std::collections::BTreeSet;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::commit_store::CommitStore;
use crate::error::MuseError;
use crate::error::MuseResult;
use crate::object_id::CommitId;
use crate::object_id::ObjectId as _;
use crate::refs::RefCategory;
use crate::refs::RefStore;
use crate::tags::TagIndex;

const SHORT_ID_LEN: usize = 8;

fn short_id(id: &CommitId) -> String {
    id.hex()[..SHORT_ID_LEN].to_string()
}

/// One commit as it appears in an [`InspectGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectCommit {
    pub id: CommitId,
    pub short_id: String,
    pub parents: Vec<CommitId>,
    pub branch: String,
    pub message: String,
    pub author: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub tags: BTreeSet<String>,
}

/// The reachable commit DAG, ready to render (SPEC_FULL.md §11.1). `edges`
/// run parent-to-child, matching the direction history flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectGraph {
    pub commits: Vec<InspectCommit>,
    pub edges: Vec<(CommitId, CommitId)>,
}

/// Builds the graph reachable from `starts` (every branch tip when `None`),
/// in commit-id order for determinism.
pub fn build_graph(
    commits: &CommitStore,
    tags: &TagIndex,
    refs: &RefStore,
    starts: Option<&[CommitId]>,
) -> MuseResult<InspectGraph> {
    let starts: Vec<CommitId> = match starts {
        Some(ids) => ids.to_vec(),
        None => refs.list(RefCategory::Branch)?.into_iter().map(|(_, id)| id).collect(),
    };

    let mut reachable: BTreeSet<CommitId> = BTreeSet::new();
    for start in &starts {
        reachable.extend(commits.ancestors(start)?);
    }
    let ids: Vec<CommitId> = reachable.into_iter().collect();

    let tag_map = tags.tags_for_many(&ids)?;
    let mut inspect_commits = Vec::with_capacity(ids.len());
    let mut edges = Vec::new();
    for id in &ids {
        let commit = commits.get(id)?;
        for parent in commit.parent_ids() {
            edges.push((parent, id.clone()));
        }
        inspect_commits.push(InspectCommit {
            id: id.clone(),
            short_id: short_id(id),
            parents: commit.parent_ids(),
            branch: commit.branch,
            message: commit.message,
            author: commit.author,
            timestamp: commit.committed_at,
            tags: tag_map.get(id).cloned().unwrap_or_default(),
        });
    }
    edges.sort();

    Ok(InspectGraph { commits: inspect_commits, edges })
}

/// Serializes `graph` as pretty-printed JSON.
pub fn to_json(graph: &InspectGraph) -> MuseResult<String> {
    serde_json::to_string_pretty(graph)
        .map_err(|source| MuseError::internal(format!("failed to serialize inspect graph: {source}")))
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ")
}

/// Renders `graph` as a Graphviz DOT digraph.
pub fn to_dot(graph: &InspectGraph) -> String {
    let mut out = String::from("digraph muse {\n");
    for commit in &graph.commits {
        out.push_str(&format!(
            "  \"{}\" [label=\"{}: {}\"];\n",
            commit.short_id,
            commit.short_id,
            escape(&commit.message)
        ));
    }
    for (parent, child) in &graph.edges {
        out.push_str(&format!("  \"{}\" -> \"{}\";\n", short_id(parent), short_id(child)));
    }
    out.push_str("}\n");
    out
}

/// Renders `graph` as a Mermaid `graph TD` diagram.
pub fn to_mermaid(graph: &InspectGraph) -> String {
    let mut out = String::from("graph TD\n");
    for commit in &graph.commits {
        out.push_str(&format!("  {}[\"{}\"]\n", commit.short_id, escape(&commit.message)));
    }
    for (parent, child) in &graph.edges {
        out.push_str(&format!("  {} --> {}\n", short_id(parent), short_id(child)));
    }
    out
}
