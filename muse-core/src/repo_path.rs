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

//! POSIX-style relative paths used as manifest keys (spec §3, §6).
//!
//! Distilled from `jj-lib`'s much larger `repo_path.rs` (which models a tree
//! of path *components* for its tree-of-trees backend): this crate's
//! manifests are flat `path -> object_id` maps, so a repo path only needs to
//! be validated and compared, never decomposed into components.

use std::fmt;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoPathError {
    #[error("path must not be empty")]
    Empty,
    #[error("path must not be absolute: {0}")]
    Absolute(String),
    #[error("path must use '/' separators and contain no '.' or '..' components: {0}")]
    InvalidComponent(String),
}

/// A validated, POSIX-style path relative to the working directory
/// (`muse-work/`), used as a manifest key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RepoPathBuf(String);

impl RepoPathBuf {
    /// Validates and constructs a repo path from a POSIX-style string.
    ///
    /// Byte-wise `Ord` on the underlying `String` is what spec §4.2 means by
    /// "sort entries by path using byte-wise ordering" — `str`/`String`
    /// comparison in Rust is already a byte-wise comparison of valid UTF-8,
    /// so no custom `Ord` impl is needed here.
    pub fn new(s: impl Into<String>) -> Result<Self, RepoPathError> {
        let s = s.into();
        if s.is_empty() {
            return Err(RepoPathError::Empty);
        }
        if s.starts_with('/') {
            return Err(RepoPathError::Absolute(s));
        }
        if s.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            return Err(RepoPathError::InvalidComponent(s));
        }
        Ok(Self(s))
    }

    /// Builds a repo path from a path found while walking the working
    /// directory, relative to its root.
    pub fn from_relative_path(path: &Path) -> Result<Self, RepoPathError> {
        let s = path
            .to_str()
            .ok_or_else(|| RepoPathError::InvalidComponent(path.display().to_string()))?
            .replace(std::path::MAIN_SEPARATOR, "/");
        Self::new(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_std_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for RepoPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RepoPathBuf {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_relative_paths() {
        assert!(RepoPathBuf::new("a.mid").is_ok());
        assert!(RepoPathBuf::new("tracks/drums/kick.mid").is_ok());
    }

    #[test]
    fn rejects_escaping_or_absolute_paths() {
        assert_eq!(RepoPathBuf::new(""), Err(RepoPathError::Empty));
        assert!(matches!(
            RepoPathBuf::new("/a.mid"),
            Err(RepoPathError::Absolute(_))
        ));
        assert!(matches!(
            RepoPathBuf::new("../a.mid"),
            Err(RepoPathError::InvalidComponent(_))
        ));
        assert!(matches!(
            RepoPathBuf::new("a//b.mid"),
            Err(RepoPathError::InvalidComponent(_))
        ));
    }

    #[test]
    fn byte_wise_ordering_matches_sort() {
        let mut paths = vec![
            RepoPathBuf::new("b.mid").unwrap(),
            RepoPathBuf::new("A.mid").unwrap(),
            RepoPathBuf::new("a.mid").unwrap(),
        ];
        paths.sort();
        assert_eq!(
            paths.iter().map(RepoPathBuf::as_str).collect::<Vec<_>>(),
            vec!["A.mid", "a.mid", "b.mid"]
        );
    }
}
