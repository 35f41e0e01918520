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

//! The ref store: branches, lightweight tags, and `HEAD` (spec §4.4).
//!
//! One file per ref under `.muse/refs/heads/<name>` or
//! `.muse/refs/tags/<name>`, holding the referenced commit's hex id, plus a
//! single `.muse/HEAD` that is either a symbolic pointer (`ref:
//! refs/heads/<name>`) or, when detached, a raw commit hex id. The shape is
//! Git's, kept because spec §4.4 asks for Git-style refs; the atomic-rename
//! write path is the one shared with every other store in this crate
//! (`crate::file_util`).

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::debug;
use tracing::instrument;

use crate::error::MuseError;
use crate::error::MuseResult;
use crate::file_util::create_or_reuse_dir;
use crate::file_util::persist_temp_file;
use crate::object_id::CommitId;
use crate::object_id::ObjectId as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefCategory {
    Branch,
    Tag,
}

impl RefCategory {
    fn dirname(self) -> &'static str {
        match self {
            RefCategory::Branch => "heads",
            RefCategory::Tag => "tags",
        }
    }
}

/// A validated branch or tag name (spec §4.4): non-empty, no path
/// traversal, no whitespace, and none of the Git-style reserved tokens that
/// would be confusing to resolve (`HEAD`, a bare `~`, a leading `-`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefName(String);

impl RefName {
    pub fn new(name: impl Into<String>) -> MuseResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(MuseError::user("ref name must not be empty"));
        }
        if name == "HEAD" {
            return Err(MuseError::user("HEAD is reserved and cannot name a branch or tag"));
        }
        if name.starts_with('-') {
            return Err(MuseError::user(format!("ref name {name:?} must not start with '-'")));
        }
        let is_valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/');
        if !name.chars().all(is_valid_char) {
            return Err(MuseError::user(format!(
                "ref name {name:?} may only contain ASCII letters, digits, '-', '_', '.', '/'"
            )));
        }
        if name.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
            return Err(MuseError::user(format!("ref name {name:?} has an invalid path segment")));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolved state of `HEAD` (spec §4.4, §4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// `HEAD` points at a branch, which may or may not itself exist yet
    /// (an unborn branch, before the first commit).
    Branch(RefName),
    /// `HEAD` points directly at a commit, with no branch attached.
    Detached(CommitId),
}

const SYMBOLIC_PREFIX: &str = "ref: refs/heads/";

#[derive(Debug, Clone)]
pub struct RefStore {
    /// `.muse` directory root.
    muse_dir: PathBuf,
}

impl RefStore {
    pub fn new(muse_dir: PathBuf) -> Self {
        Self { muse_dir }
    }

    pub fn init(muse_dir: &Path) -> MuseResult<()> {
        create_or_reuse_dir(&muse_dir.join("refs"))?;
        create_or_reuse_dir(&muse_dir.join("refs").join("heads"))?;
        create_or_reuse_dir(&muse_dir.join("refs").join("tags"))?;
        Ok(())
    }

    fn category_dir(&self, category: RefCategory) -> PathBuf {
        self.muse_dir.join("refs").join(category.dirname())
    }

    fn ref_path(&self, category: RefCategory, name: &RefName) -> PathBuf {
        self.category_dir(category).join(name.as_str())
    }

    fn head_path(&self) -> PathBuf {
        self.muse_dir.join("HEAD")
    }

    pub fn read(&self, category: RefCategory, name: &RefName) -> MuseResult<Option<CommitId>> {
        let path = self.ref_path(category, name);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(parse_commit_id(&path, contents.trim())?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(MuseError::Io(err)),
        }
    }

    fn write_file(&self, path: &Path, contents: &str) -> MuseResult<()> {
        if let Some(parent) = path.parent() {
            create_or_reuse_dir(parent)?;
        }
        let mut temp_file = NamedTempFile::new_in(path.parent().expect("ref path has a parent"))?;
        temp_file.write_all(contents.as_bytes())?;
        persist_temp_file(temp_file, path)?;
        Ok(())
    }

    #[instrument(skip(self), fields(?category, name = %name, target = %target.hex()))]
    pub fn write(&self, category: RefCategory, name: &RefName, target: &CommitId) -> MuseResult<()> {
        let path = self.ref_path(category, name);
        self.write_file(&path, &format!("{}\n", target.hex()))?;
        debug!("wrote ref");
        Ok(())
    }

    /// Atomically updates `name` only if its current value equals `expected`
    /// (spec §4.4's compare-and-swap semantics). `None` means "must not
    /// currently exist" / "delete".
    #[instrument(skip(self), fields(?category, name = %name))]
    pub fn compare_and_swap(
        &self,
        category: RefCategory,
        name: &RefName,
        expected: Option<&CommitId>,
        new: Option<&CommitId>,
    ) -> MuseResult<()> {
        let actual = self.read(category, name)?;
        if actual.as_ref() != expected {
            return Err(MuseError::CasMismatch {
                name: name.clone(),
                expected: expected.map(CommitId::hex),
                actual: actual.map(|id| id.hex()),
            });
        }
        match new {
            Some(target) => self.write(category, name, target)?,
            None => self.delete(category, name)?,
        }
        debug!("ref cas succeeded");
        Ok(())
    }

    pub fn delete(&self, category: RefCategory, name: &RefName) -> MuseResult<()> {
        let path = self.ref_path(category, name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MuseError::Io(err)),
        }
    }

    pub fn list(&self, category: RefCategory) -> MuseResult<Vec<(RefName, CommitId)>> {
        let dir = self.category_dir(category);
        let mut result = Vec::new();
        collect_refs(&dir, &dir, &mut result)?;
        result.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(result)
    }

    pub fn read_head(&self) -> MuseResult<Head> {
        let path = self.head_path();
        let contents = fs::read_to_string(&path)?;
        let trimmed = contents.trim();
        if let Some(branch) = trimmed.strip_prefix(SYMBOLIC_PREFIX) {
            Ok(Head::Branch(RefName::new(branch)?))
        } else {
            Ok(Head::Detached(parse_commit_id(&path, trimmed)?))
        }
    }

    pub fn set_head_branch(&self, name: &RefName) -> MuseResult<()> {
        self.write_file(&self.head_path(), &format!("{SYMBOLIC_PREFIX}{name}\n"))
    }

    pub fn set_head_detached(&self, commit_id: &CommitId) -> MuseResult<()> {
        self.write_file(&self.head_path(), &format!("{}\n", commit_id.hex()))
    }

    /// Resolves `HEAD` all the way through to a commit id, or `None` for an
    /// unborn branch (spec §4.8: the very first commit on a fresh repo).
    pub fn resolve_head(&self) -> MuseResult<Option<CommitId>> {
        match self.read_head()? {
            Head::Detached(id) => Ok(Some(id)),
            Head::Branch(name) => self.read(RefCategory::Branch, &name),
        }
    }
}

fn parse_commit_id(path: &Path, hex: &str) -> MuseResult<CommitId> {
    CommitId::from_hex(hex).ok_or_else(|| MuseError::RepoCorrupt {
        detail: format!("{} does not contain a valid hex commit id: {hex:?}", path.display()),
    })
}

fn collect_refs(root: &Path, dir: &Path, out: &mut Vec<(RefName, CommitId)>) -> MuseResult<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_refs(root, &path, out)?;
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .expect("walked path is under root")
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        let contents = fs::read_to_string(&path)?;
        let id = parse_commit_id(&path, contents.trim())?;
        out.push((RefName::new(relative)?, id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::new_temp_dir;

    fn cid(b: u8) -> CommitId {
        CommitId::new(vec![b; 32])
    }

    fn new_store() -> (tempfile::TempDir, RefStore) {
        let dir = new_temp_dir();
        let muse_dir = dir.path().join(".muse");
        create_or_reuse_dir(&muse_dir).unwrap();
        RefStore::init(&muse_dir).unwrap();
        (dir, RefStore::new(muse_dir))
    }

    #[test]
    fn branch_write_read_roundtrip() {
        let (_dir, store) = new_store();
        let name = RefName::new("main").unwrap();
        store.write(RefCategory::Branch, &name, &cid(1)).unwrap();
        assert_eq!(store.read(RefCategory::Branch, &name).unwrap(), Some(cid(1)));
    }

    #[test]
    fn compare_and_swap_rejects_stale_expectation() {
        let (_dir, store) = new_store();
        let name = RefName::new("main").unwrap();
        store.write(RefCategory::Branch, &name, &cid(1)).unwrap();
        let err = store
            .compare_and_swap(RefCategory::Branch, &name, Some(&cid(2)), Some(&cid(3)))
            .unwrap_err();
        assert!(matches!(err, MuseError::CasMismatch { .. }));
        assert_eq!(store.read(RefCategory::Branch, &name).unwrap(), Some(cid(1)));
    }

    #[test]
    fn compare_and_swap_accepts_matching_expectation() {
        let (_dir, store) = new_store();
        let name = RefName::new("main").unwrap();
        store.write(RefCategory::Branch, &name, &cid(1)).unwrap();
        store
            .compare_and_swap(RefCategory::Branch, &name, Some(&cid(1)), Some(&cid(2)))
            .unwrap();
        assert_eq!(store.read(RefCategory::Branch, &name).unwrap(), Some(cid(2)));
    }

    #[test]
    fn head_symbolic_and_detached_roundtrip() {
        let (_dir, store) = new_store();
        let name = RefName::new("main").unwrap();
        store.set_head_branch(&name).unwrap();
        assert_eq!(store.read_head().unwrap(), Head::Branch(name.clone()));

        store.set_head_detached(&cid(9)).unwrap();
        assert_eq!(store.read_head().unwrap(), Head::Detached(cid(9)));
    }

    #[test]
    fn resolve_head_follows_branch() {
        let (_dir, store) = new_store();
        let name = RefName::new("main").unwrap();
        store.write(RefCategory::Branch, &name, &cid(4)).unwrap();
        store.set_head_branch(&name).unwrap();
        assert_eq!(store.resolve_head().unwrap(), Some(cid(4)));
    }

    #[test]
    fn unborn_branch_resolves_to_none() {
        let (_dir, store) = new_store();
        let name = RefName::new("main").unwrap();
        store.set_head_branch(&name).unwrap();
        assert_eq!(store.resolve_head().unwrap(), None);
    }

    #[test]
    fn list_finds_nested_and_flat_refs() {
        let (_dir, store) = new_store();
        store
            .write(RefCategory::Branch, &RefName::new("main").unwrap(), &cid(1))
            .unwrap();
        store
            .write(RefCategory::Branch, &RefName::new("feature/solo").unwrap(), &cid(2))
            .unwrap();
        let listed = store.list(RefCategory::Branch).unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn reject_reserved_and_malformed_names() {
        assert!(RefName::new("HEAD").is_err());
        assert!(RefName::new("").is_err());
        assert!(RefName::new("-weird").is_err());
        assert!(RefName::new("a//b").is_err());
        assert!(RefName::new("a/../b").is_err());
    }
}
