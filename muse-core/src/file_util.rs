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

//! Filesystem helpers for atomic, crash-safe writes (spec §5's "Atomicity").
//!
//! Distilled from `jj-lib`'s `file_util.rs`: `persist_temp_file` and
//! `persist_content_addressed_temp_file` are carried over near-verbatim
//! (write to a `NamedTempFile`, `sync_data`, then rename into place); dropped
//! are the async-reader helpers and the Windows/Unix path-encoding
//! conveniences jj needs for its Git interop, which this crate has no use
//! for.

use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;
use tempfile::PersistError;

/// Creates `dirname` if missing; a pre-existing directory is not an error.
pub fn create_or_reuse_dir(dirname: &Path) -> io::Result<()> {
    match fs::create_dir(dirname) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err),
    }
}

/// Persists a temporary file after fsyncing its content, always overwriting
/// any existing file at `new_path`. Used for refs and other mutable files
/// where the new value should replace the old one atomically.
pub fn persist_temp_file<P: AsRef<Path>>(
    temp_file: NamedTempFile,
    new_path: P,
) -> io::Result<File> {
    temp_file.as_file().sync_data()?;
    temp_file
        .persist(new_path)
        .map_err(|PersistError { error, file: _ }| error)
}

/// Like [`persist_temp_file`], but for content-addressed destinations: if
/// `new_path` already exists its content is guaranteed identical (same
/// hash), so either file content read back afterwards is correct. On Unix
/// this is just an atomic rename; on Windows, where renaming over an
/// existing open file can fail, falls back to keeping the existing file.
pub fn persist_content_addressed_temp_file<P: AsRef<Path>>(
    temp_file: NamedTempFile,
    new_path: P,
) -> io::Result<File> {
    temp_file.as_file().sync_data()?;
    if cfg!(windows) {
        match temp_file.persist_noclobber(&new_path) {
            Ok(file) => Ok(file),
            Err(PersistError { error, file: _ }) => {
                if let Ok(existing_file) = File::open(new_path) {
                    Ok(existing_file)
                } else {
                    Err(error)
                }
            }
        }
    } else {
        temp_file
            .persist(new_path)
            .map_err(|PersistError { error, file: _ }| error)
    }
}
