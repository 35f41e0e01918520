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

//! Ref resolution (spec §4.9): the single resolver every user-supplied ref
//! string goes through, in precedence order — `HEAD`, `HEAD~N`, full hex,
//! hex prefix, bare branch name.

use crate::commit_store::CommitStore;
use crate::error::MuseError;
use crate::error::MuseResult;
use crate::object_id::CommitId;
use crate::object_id::HexPrefix;
use crate::refs::RefCategory;
use crate::refs::RefName;
use crate::refs::RefStore;

const FULL_HEX_LEN: usize = 64;
const MIN_PREFIX_LEN: usize = 4;

/// Resolves `spec` against the ref store and commit store, in the
/// precedence order spec §4.9 lays out.
pub fn resolve(refs: &RefStore, commits: &CommitStore, spec: &str) -> MuseResult<CommitId> {
    if spec == "HEAD" {
        return refs
            .resolve_head()?
            .ok_or_else(|| MuseError::user("HEAD does not point to any commit yet"));
    }

    if let Some(steps) = spec.strip_prefix("HEAD~") {
        let n: usize = steps
            .parse()
            .map_err(|_| MuseError::UnresolvedRef(spec.to_string()))?;
        let head = refs
            .resolve_head()?
            .ok_or_else(|| MuseError::user("HEAD does not point to any commit yet"))?;
        let chain = commits.walk_first_parent(&head, Some(n + 1))?;
        return chain
            .into_iter()
            .nth(n)
            .ok_or_else(|| MuseError::user(format!("{spec} goes back further than the history of HEAD")));
    }

    if spec.len() == FULL_HEX_LEN && spec.bytes().all(|b| b.is_ascii_hexdigit()) {
        let id = CommitId::from_hex(spec).ok_or_else(|| MuseError::UnresolvedRef(spec.to_string()))?;
        return if commits.contains(&id) {
            Ok(id)
        } else {
            Err(MuseError::missing_object(&id))
        };
    }

    if spec.len() >= MIN_PREFIX_LEN
        && spec.len() < FULL_HEX_LEN
        && spec.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        let prefix = HexPrefix::new(spec).expect("already validated as lowercase hex");
        let mut matches = commits.find_by_prefix(&prefix)?;
        matches.sort();
        return match matches.len() {
            0 => Err(MuseError::UnresolvedRef(spec.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(MuseError::AmbiguousRef {
                name: spec.to_string(),
                candidates: matches.iter().map(CommitId::hex).collect(),
            }),
        };
    }

    let name = RefName::new(spec)?;
    refs.read(RefCategory::Branch, &name)?
        .ok_or_else(|| MuseError::UnresolvedRef(spec.to_string()))
}
