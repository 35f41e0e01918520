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

//! `.muse/config.toml` (spec §6): `[user] name`, `[remotes.<name>] url`,
//! `[auth] token`.
//!
//! Scaled down from `jj-lib::config`'s multi-layer resolver
//! (`examples/yuja-jj/lib/src/config.rs`): one file, no layering, no
//! per-key override chain. Kept is the thing that made `jj-lib` worth
//! copying from: `toml_edit::DocumentMut` as the in-memory representation,
//! so a hand-edited file's comments and formatting survive a load-modify-
//! save round trip.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;
use toml_edit::DocumentMut;

use crate::error::MuseError;
use crate::error::MuseResult;
use crate::file_util::persist_temp_file;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: Option<String>,
}

/// In-memory view of `config.toml`, backed by the parsed document so that
/// [`RepoConfig::save`] preserves whatever the user didn't touch.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    document: DocumentMut,
}

impl RepoConfig {
    /// Loads `path`; a missing file is not an error (spec §14: "tolerant of
    /// a missing file").
    pub fn load(path: &Path) -> MuseResult<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::empty()),
            Err(err) => Err(MuseError::Io(err)),
        }
    }

    pub fn parse(text: &str, path: &Path) -> MuseResult<Self> {
        let document: DocumentMut = text
            .parse()
            .map_err(|source| MuseError::Toml { path: path.to_path_buf(), source })?;
        Ok(Self { document })
    }

    pub fn empty() -> Self {
        Self { document: DocumentMut::new() }
    }

    pub fn save(&self, path: &Path) -> MuseResult<()> {
        let rendered = self.document.to_string();
        let dir = path.parent().expect("config path has a parent");
        let mut temp_file = NamedTempFile::new_in(dir)?;
        temp_file.write_all(rendered.as_bytes())?;
        persist_temp_file(temp_file, path)?;
        Ok(())
    }

    pub fn user_name(&self) -> Option<&str> {
        self.document.get("user")?.get("name")?.as_str()
    }

    pub fn set_user_name(&mut self, name: &str) {
        self.document
            .entry("user")
            .or_insert(toml_edit::table())["name"] = toml_edit::value(name);
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.document.get("auth")?.get("token")?.as_str()
    }

    pub fn set_auth_token(&mut self, token: &str) {
        self.document
            .entry("auth")
            .or_insert(toml_edit::table())["token"] = toml_edit::value(token);
    }

    pub fn remote(&self, name: &str) -> Option<RemoteConfig> {
        let url = self
            .document
            .get("remotes")?
            .get(name)?
            .get("url")?
            .as_str()
            .map(str::to_string);
        Some(RemoteConfig { url })
    }

    pub fn set_remote_url(&mut self, name: &str, url: &str) {
        let remotes = self.document.entry("remotes").or_insert(toml_edit::table());
        let remotes_table = remotes.as_table_like_mut().expect("remotes is a table");
        if remotes_table.get(name).is_none() {
            remotes_table.insert(name, toml_edit::table());
        }
        remotes_table[name]["url"] = toml_edit::value(url);
    }

    pub fn remotes(&self) -> BTreeMap<String, RemoteConfig> {
        let Some(remotes) = self.document.get("remotes").and_then(|item| item.as_table_like()) else {
            return BTreeMap::new();
        };
        remotes
            .iter()
            .map(|(name, item)| {
                let url = item.get("url").and_then(|v| v.as_str()).map(str::to_string);
                (name.to_string(), RemoteConfig { url })
            })
            .collect()
    }
}
