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

//! The repository handle (spec §5, §6): ties the object/snapshot/commit
//! stores, ref store, tag index, and config together over one `.muse`
//! directory, and owns the directory-discovery and locking the other
//! modules assume a caller has already done.

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::instrument;
use uuid::Uuid;

use crate::commit_store::CommitStore;
use crate::config::RepoConfig;
use crate::error::MuseError;
use crate::error::MuseResult;
use crate::file_util::create_or_reuse_dir;
use crate::file_util::persist_temp_file;
use crate::lock::RepoLock;
use crate::object_store::ObjectStore;
use crate::refs::RefCategory;
use crate::refs::RefName;
use crate::refs::RefStore;
use crate::snapshot::Manifest;
use crate::snapshot::SnapshotStore;
use crate::tags::TagIndex;

/// Current `repo.json` schema version. Bumped whenever the on-disk layout
/// changes in a way that breaks older readers.
pub const SCHEMA_VERSION: &str = "1";

const MUSE_DIRNAME: &str = ".muse";
const WORKDIR_DIRNAME: &str = "muse-work";
const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RepoMetadata {
    repo_id: Uuid,
    schema_version: String,
}

/// The rendering boundary spec.md §9 calls out as deliberately out of
/// scope for the core: something outside this crate turns a [`Manifest`]
/// into audible output. The core never calls this itself; a CLI or other
/// caller wires up an implementation and invokes it explicitly.
pub trait AudioRenderer {
    fn render(&self, manifest: &Manifest) -> MuseResult<()>;
}

/// A handle onto one repository's `.muse` directory and `muse-work/`
/// working tree, plus its opened stores.
#[derive(Debug)]
pub struct Repo {
    muse_dir: PathBuf,
    workdir_root: PathBuf,
    repo_id: Uuid,
    objects: ObjectStore,
    snapshots: SnapshotStore,
    commits: CommitStore,
    refs: RefStore,
    tags: TagIndex,
    config: RepoConfig,
}

impl Repo {
    /// Initializes a new repository at `root` (spec §6's layout): creates
    /// `.muse/` with its subdirectories, `repo.json`, an empty `config.toml`
    /// (left absent until first write), an unborn `HEAD` on `main`, and an
    /// empty `muse-work/`.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn init(root: &Path) -> MuseResult<Self> {
        let muse_dir = root.join(MUSE_DIRNAME);
        if muse_dir.exists() {
            return Err(MuseError::user(format!(
                "{} already contains a .muse directory",
                root.display()
            )));
        }
        create_or_reuse_dir(root)?;
        create_or_reuse_dir(&muse_dir)?;

        let objects_root = muse_dir.join("objects");
        ObjectStore::init(&objects_root)?;
        let snapshots_root = muse_dir.join("snapshots");
        SnapshotStore::init(&snapshots_root)?;
        let commits_root = muse_dir.join("commits");
        CommitStore::init(&commits_root)?;
        RefStore::init(&muse_dir)?;
        let tags_path = muse_dir.join("tags.json");
        TagIndex::init(&tags_path)?;

        let workdir_root = root.join(WORKDIR_DIRNAME);
        create_or_reuse_dir(&workdir_root)?;

        let repo_id = Uuid::new_v4();
        write_repo_metadata(&muse_dir, &RepoMetadata { repo_id, schema_version: SCHEMA_VERSION.to_string() })?;

        let refs = RefStore::new(muse_dir.clone());
        let default_branch = RefName::new(DEFAULT_BRANCH).expect("default branch name is valid");
        refs.set_head_branch(&default_branch)?;

        Ok(Self {
            muse_dir: muse_dir.clone(),
            workdir_root,
            repo_id,
            objects: ObjectStore::new(objects_root),
            snapshots: SnapshotStore::new(snapshots_root),
            commits: CommitStore::new(commits_root),
            refs,
            tags: TagIndex::new(tags_path),
            config: RepoConfig::load(&muse_dir.join("config.toml"))?,
        })
    }

    /// Opens the repository containing `start`, walking up parent
    /// directories until a `.muse` directory is found (spec §6,
    /// [`MuseError::NotARepository`] if none exists).
    pub fn open(start: &Path) -> MuseResult<Self> {
        let mut candidate = start.to_path_buf();
        loop {
            let muse_dir = candidate.join(MUSE_DIRNAME);
            if muse_dir.is_dir() {
                return Self::open_at(&candidate);
            }
            if !candidate.pop() {
                return Err(MuseError::NotARepository { searched_from: start.to_path_buf() });
            }
        }
    }

    /// Opens the repository rooted exactly at `root` (its `.muse` must
    /// already exist directly under it).
    pub fn open_at(root: &Path) -> MuseResult<Self> {
        let muse_dir = root.join(MUSE_DIRNAME);
        let metadata = read_repo_metadata(&muse_dir)?;

        Ok(Self {
            objects: ObjectStore::new(muse_dir.join("objects")),
            snapshots: SnapshotStore::new(muse_dir.join("snapshots")),
            commits: CommitStore::new(muse_dir.join("commits")),
            refs: RefStore::new(muse_dir.clone()),
            tags: TagIndex::new(muse_dir.join("tags.json")),
            config: RepoConfig::load(&muse_dir.join("config.toml"))?,
            workdir_root: root.join(WORKDIR_DIRNAME),
            repo_id: metadata.repo_id,
            muse_dir,
        })
    }

    pub fn muse_dir(&self) -> &Path {
        &self.muse_dir
    }

    pub fn workdir_root(&self) -> &Path {
        &self.workdir_root
    }

    pub fn repo_id(&self) -> Uuid {
        self.repo_id
    }

    pub fn merge_state_path(&self) -> PathBuf {
        self.muse_dir.join("MERGE_STATE.json")
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn commits(&self) -> &CommitStore {
        &self.commits
    }

    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RepoConfig {
        &mut self.config
    }

    pub fn save_config(&self) -> MuseResult<()> {
        self.config.save(&self.muse_dir.join("config.toml"))
    }

    /// Blocks until this process holds the repository's exclusive lock
    /// (spec §5: single-writer-per-repository). Every mutating operation
    /// should be called with this guard held for its duration.
    pub fn lock(&self) -> MuseResult<RepoLock> {
        RepoLock::acquire(&crate::lock::lock_path(&self.muse_dir))
    }

    pub fn current_branch(&self) -> MuseResult<Option<RefName>> {
        match self.refs.read_head()? {
            crate::refs::Head::Branch(name) => Ok(Some(name)),
            crate::refs::Head::Detached(_) => Ok(None),
        }
    }
}

fn repo_metadata_path(muse_dir: &Path) -> PathBuf {
    muse_dir.join("repo.json")
}

fn write_repo_metadata(muse_dir: &Path, metadata: &RepoMetadata) -> MuseResult<()> {
    let path = repo_metadata_path(muse_dir);
    let json = serde_json::to_vec_pretty(metadata).map_err(|source| MuseError::Json { path: path.clone(), source })?;
    let mut temp_file = NamedTempFile::new_in(muse_dir)?;
    temp_file.write_all(&json)?;
    persist_temp_file(temp_file, &path)?;
    Ok(())
}

fn read_repo_metadata(muse_dir: &Path) -> MuseResult<RepoMetadata> {
    let path = repo_metadata_path(muse_dir);
    let bytes = fs::read(&path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            MuseError::RepoCorrupt { detail: format!("{} is missing repo.json", muse_dir.display()) }
        } else {
            MuseError::Io(err)
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|source| MuseError::Json { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::new_temp_dir;

    #[test]
    fn init_creates_layout_and_unborn_head() {
        let dir = new_temp_dir();
        let repo = Repo::init(dir.path()).unwrap();

        assert!(repo.muse_dir().join("objects").is_dir());
        assert!(repo.muse_dir().join("repo.json").is_file());
        assert!(repo.workdir_root().is_dir());
        assert_eq!(repo.current_branch().unwrap(), Some(RefName::new("main").unwrap()));
        assert_eq!(repo.refs().resolve_head().unwrap(), None);
    }

    #[test]
    fn init_twice_in_the_same_directory_is_a_user_error() {
        let dir = new_temp_dir();
        Repo::init(dir.path()).unwrap();
        let err = Repo::init(dir.path()).unwrap_err();
        assert!(matches!(err, MuseError::UserError(_)));
    }

    #[test]
    fn open_walks_up_from_a_nested_working_directory() {
        let dir = new_temp_dir();
        Repo::init(dir.path()).unwrap();
        let nested = dir.path().join("muse-work").join("nested");
        fs::create_dir_all(&nested).unwrap();

        let repo = Repo::open(&nested).unwrap();
        assert_eq!(repo.muse_dir(), dir.path().join(".muse"));
    }

    #[test]
    fn open_outside_any_repository_is_not_a_repository_error() {
        let dir = new_temp_dir();
        let err = Repo::open(dir.path()).unwrap_err();
        assert!(matches!(err, MuseError::NotARepository { .. }));
    }

    #[test]
    fn repo_id_is_stable_across_reopen() {
        let dir = new_temp_dir();
        let initial = Repo::init(dir.path()).unwrap();
        let reopened = Repo::open_at(dir.path()).unwrap();
        assert_eq!(initial.repo_id(), reopened.repo_id());
    }
}
