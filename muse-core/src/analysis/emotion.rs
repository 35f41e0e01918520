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

//! Emotion-diff (spec §4.10): a 4-dimensional vector delta, Euclidean
//! drift, and a narrative bucket between two commits.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::commit::Commit;
use crate::commit_store::CommitStore;
use crate::error::MuseResult;
use crate::object_id::CommitId;
use crate::tags::TagIndex;

/// Energy, valence, tension, darkness — each clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmotionVector {
    pub energy: f64,
    pub valence: f64,
    pub tension: f64,
    pub darkness: f64,
}

impl EmotionVector {
    const fn new(energy: f64, valence: f64, tension: f64, darkness: f64) -> Self {
        Self { energy, valence, tension, darkness }
    }

    fn components(self) -> [f64; 4] {
        [self.energy, self.valence, self.tension, self.darkness]
    }

    /// Euclidean distance to `other`, range `[0.0, 2.0]`.
    pub fn drift(self, other: Self) -> f64 {
        self.components()
            .iter()
            .zip(other.components())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    fn delta(self, other: Self) -> Self {
        Self::new(
            other.energy - self.energy,
            other.valence - self.valence,
            other.tension - self.tension,
            other.darkness - self.darkness,
        )
    }
}

const DIMENSION_NAMES: [&str; 4] = ["energy", "valence", "tension", "darkness"];

/// Fixed catalogue resolving an `emotion:<label>` tag value to a vector.
static CATALOGUE: LazyLock<BTreeMap<&'static str, EmotionVector>> = LazyLock::new(|| {
    BTreeMap::from([
        ("joyful", EmotionVector::new(0.80, 0.90, 0.20, 0.10)),
        ("melancholic", EmotionVector::new(0.30, 0.30, 0.40, 0.60)),
        ("anxious", EmotionVector::new(0.60, 0.20, 0.80, 0.50)),
        ("cinematic", EmotionVector::new(0.55, 0.50, 0.50, 0.40)),
        ("peaceful", EmotionVector::new(0.20, 0.70, 0.10, 0.20)),
        ("dramatic", EmotionVector::new(0.80, 0.30, 0.70, 0.60)),
        ("hopeful", EmotionVector::new(0.60, 0.70, 0.30, 0.20)),
        ("tense", EmotionVector::new(0.70, 0.20, 0.90, 0.50)),
        ("dark", EmotionVector::new(0.40, 0.20, 0.50, 0.80)),
        ("euphoric", EmotionVector::new(0.90, 0.90, 0.30, 0.10)),
        ("serene", EmotionVector::new(0.25, 0.65, 0.15, 0.25)),
        ("epic", EmotionVector::new(0.85, 0.55, 0.65, 0.45)),
        ("mysterious", EmotionVector::new(0.35, 0.40, 0.60, 0.55)),
        ("aggressive", EmotionVector::new(0.90, 0.25, 0.85, 0.70)),
        ("nostalgic", EmotionVector::new(0.35, 0.50, 0.35, 0.50)),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionSource {
    ExplicitTags,
    Mixed,
    Inferred,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmotionDiffResult {
    pub vector_a: EmotionVector,
    pub vector_b: EmotionVector,
    pub delta: EmotionVector,
    pub drift: f64,
    pub source: EmotionSource,
    pub narrative: String,
}

const TAG_PREFIX: &str = "emotion:";

/// Maps `tempo_bpm` to an energy level via spec §4.10's monotonic mapping
/// (60 BPM → 0.0, 180 BPM → 1.0, clamped), then derives the remaining three
/// dimensions from it with the original's fixed linear combinations: fast
/// tempo correlates with slightly higher valence and rhythmic tension, and
/// inversely with darkness.
fn vector_from_tempo(tempo_bpm: Option<f64>) -> EmotionVector {
    let Some(bpm) = tempo_bpm else {
        return EmotionVector::new(0.5, 0.5, 0.5, 0.5);
    };
    let energy = ((bpm - 60.0) / 120.0).clamp(0.0, 1.0);
    let valence = (0.3 + energy * 0.4).clamp(0.0, 1.0);
    let tension = (0.2 + energy * 0.5).clamp(0.0, 1.0);
    let darkness = (0.7 - energy * 0.6).clamp(0.0, 1.0);
    EmotionVector::new(energy, valence, tension, darkness)
}

fn vector_for_commit(commit: &Commit, tags: &std::collections::BTreeSet<String>) -> (EmotionVector, bool) {
    let explicit = tags
        .iter()
        .find_map(|tag| tag.strip_prefix(TAG_PREFIX))
        .and_then(|label| CATALOGUE.get(label).copied());
    match explicit {
        Some(vector) => (vector, true),
        None => (vector_from_tempo(commit.metadata.tempo_bpm()), false),
    }
}

fn narrative(drift: f64, delta: EmotionVector) -> String {
    let magnitude = if drift < 0.05 {
        "minimal"
    } else if drift < 0.25 {
        "subtle"
    } else if drift < 0.50 {
        "moderate"
    } else if drift < 0.80 {
        "significant"
    } else {
        "major"
    };
    let components = delta.components();
    let dominant_index = components
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
        .map(|(index, _)| index)
        .unwrap_or(0);
    format!("{magnitude} shift, dominated by {}", DIMENSION_NAMES[dominant_index])
}

pub fn emotion_diff(
    commits: &CommitStore,
    tags: &TagIndex,
    a: &CommitId,
    b: &CommitId,
) -> MuseResult<EmotionDiffResult> {
    let commit_a = commits.get(a)?;
    let commit_b = commits.get(b)?;
    let tags_a = tags.tags_for(a)?;
    let tags_b = tags.tags_for(b)?;

    let (vector_a, explicit_a) = vector_for_commit(&commit_a, &tags_a);
    let (vector_b, explicit_b) = vector_for_commit(&commit_b, &tags_b);

    let source = match (explicit_a, explicit_b) {
        (true, true) => EmotionSource::ExplicitTags,
        (false, false) => EmotionSource::Inferred,
        _ => EmotionSource::Mixed,
    };

    let delta = vector_a.delta(vector_b);
    let drift = vector_a.drift(vector_b);

    Ok(EmotionDiffResult {
        vector_a,
        vector_b,
        delta,
        drift,
        source,
        narrative: narrative(drift, delta),
    })
}
