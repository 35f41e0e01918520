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

//! Core library for Muse, a music-native version control system.
//!
//! This crate has no binary and no network surface: it is the embeddable
//! engine a CLI or editor plugin links against, in the same spirit as
//! `jj-lib` sits under the `jj` command line. See `SPEC_FULL.md` at the
//! workspace root for the full system description.

pub mod analysis;
pub mod checkout;
pub mod commit;
pub mod commit_store;
pub mod config;
pub mod content_hash;
pub mod error;
pub mod file_util;
pub mod inspect;
pub mod lock;
pub mod merge;
pub mod object_id;
pub mod object_store;
pub mod pipeline;
pub mod query;
pub mod rebase;
pub mod refs;
pub mod repo;
pub mod repo_path;
pub mod resolve;
pub mod snapshot;
pub mod tags;
pub mod workdir;

pub use error::MuseError;
pub use error::MuseResult;
pub use repo::Repo;

/// Test-only helpers shared across module test suites.
#[cfg(test)]
pub(crate) mod tests {
    /// A fresh scratch directory, removed when dropped.
    pub fn new_temp_dir() -> tempfile::TempDir {
        tempfile::tempdir().expect("failed to create temp dir")
    }
}
