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

//! Musical analysis services (spec §4.10): read-only consumers of the
//! commit DAG and tag index. Each submodule is one service: emotion-diff,
//! divergence, timeline, tempo detection.

pub mod divergence;
pub mod emotion;
pub mod tempo;
pub mod timeline;
