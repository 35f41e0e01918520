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

//! The repository-scoped exclusive lock (spec §5/§9): `.muse/REPO_LOCK`.
//!
//! Grounded on `git-branchless-test`'s use of `fslock` for its exclusive
//! test-run lock file. Muse is single-writer-per-repository (spec §5): every
//! mutation acquires this lock for the duration of the call and releases it
//! on every exit path, including error, by tying the release to the guard's
//! `Drop`.

use std::path::Path;
use std::path::PathBuf;

use fslock::LockFile;

use crate::error::MuseError;
use crate::error::MuseResult;

/// Held for the duration of one mutating repository operation. Dropping it
/// releases the underlying OS lock unconditionally, so a mutation that
/// returns early via `?` still releases on every exit path.
pub struct RepoLock {
    file: LockFile,
}

impl RepoLock {
    /// Blocks until the lock at `path` (`.muse/REPO_LOCK`) is acquired.
    pub fn acquire(path: &Path) -> MuseResult<Self> {
        let mut file = LockFile::open(path).map_err(lock_error(path))?;
        file.lock().map_err(lock_error(path))?;
        Ok(Self { file })
    }

    /// Non-blocking variant: returns `Ok(None)` if another process already
    /// holds the lock, instead of waiting.
    pub fn try_acquire(path: &Path) -> MuseResult<Option<Self>> {
        let mut file = LockFile::open(path).map_err(lock_error(path))?;
        if file.try_lock().map_err(lock_error(path))? {
            Ok(Some(Self { file }))
        } else {
            Ok(None)
        }
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn lock_error(path: &Path) -> impl Fn(std::io::Error) -> MuseError + '_ {
    move |source| MuseError::Internal {
        detail: format!("failed to lock {}: {source}", path.display()),
    }
}

pub fn lock_path(muse_dir: &Path) -> PathBuf {
    muse_dir.join("REPO_LOCK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::new_temp_dir;

    #[test]
    fn try_acquire_fails_while_held() {
        let dir = new_temp_dir();
        let path = dir.path().join("REPO_LOCK");
        let held = RepoLock::try_acquire(&path).unwrap();
        assert!(held.is_some());
        let second = RepoLock::try_acquire(&path).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = new_temp_dir();
        let path = dir.path().join("REPO_LOCK");
        {
            let _held = RepoLock::try_acquire(&path).unwrap().unwrap();
        }
        let reacquired = RepoLock::try_acquire(&path).unwrap();
        assert!(reacquired.is_some());
    }
}
