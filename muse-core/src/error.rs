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

//! Error taxonomy surfaced by the core (spec §7).
//!
//! Every mutating or lookup operation in this crate returns [`MuseResult`].
//! The variants carry structured context (IDs, ref names, paths) rather than
//! pre-rendered prose, so a CLI layer can both print a human message and map
//! the error to an exit code via [`MuseError::kind`].

use std::path::PathBuf;

use thiserror::Error;

use crate::object_id::ObjectId;
use crate::refs::RefName;

/// Coarse classification used by a front-end to choose an exit code.
///
/// The core never picks an exit code itself (spec §6's taxonomy is owned by
/// the CLI layer); this exists purely so that layer doesn't need to match on
/// every [`MuseError`] variant to do so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotARepository,
    RepoCorrupt,
    UserError,
    CasMismatch,
    MissingObject,
    MergeInProgress,
    NoCommonAncestor,
    Internal,
}

#[derive(Debug, Error)]
pub enum MuseError {
    #[error("not a muse repository (or any parent up to {searched_from}): no .muse directory")]
    NotARepository { searched_from: PathBuf },

    #[error("repository is corrupt: {detail}")]
    RepoCorrupt { detail: String },

    #[error("{0}")]
    UserError(String),

    #[error("ref {name} is ambiguous: {candidates:?}")]
    AmbiguousRef { name: String, candidates: Vec<String> },

    #[error("cannot resolve {0}")]
    UnresolvedRef(String),

    #[error("compare-and-swap failed on ref {name}: expected {expected:?}, found {actual:?}")]
    CasMismatch {
        name: RefName,
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("object {} not found in object store", .object_id_prefix)]
    MissingObject { object_id_prefix: String },

    #[error("a merge is in progress (.muse/MERGE_STATE.json); resolve or run an explicit abort first")]
    MergeInProgress,

    #[error("no common ancestor between {left} and {right}")]
    NoCommonAncestor { left: String, right: String },

    #[error("internal invariant violated: {detail}")]
    Internal { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },
}

pub type MuseResult<T> = Result<T, MuseError>;

impl MuseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotARepository { .. } => ErrorKind::NotARepository,
            Self::RepoCorrupt { .. } | Self::Json { .. } | Self::Toml { .. } => {
                ErrorKind::RepoCorrupt
            }
            Self::UserError(_) | Self::AmbiguousRef { .. } | Self::UnresolvedRef(_) => {
                ErrorKind::UserError
            }
            Self::CasMismatch { .. } => ErrorKind::CasMismatch,
            Self::MissingObject { .. } => ErrorKind::MissingObject,
            Self::MergeInProgress => ErrorKind::MergeInProgress,
            Self::NoCommonAncestor { .. } => ErrorKind::NoCommonAncestor,
            Self::Internal { .. } | Self::Io(_) => ErrorKind::Internal,
        }
    }

    pub fn missing_object(id: &impl crate::object_id::ObjectId) -> Self {
        Self::MissingObject {
            object_id_prefix: id.hex().chars().take(12).collect(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    pub fn user(detail: impl Into<String>) -> Self {
        Self::UserError(detail.into())
    }
}
