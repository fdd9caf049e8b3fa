/*
Copyright 2024, Zep Software, Inc.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Pairwise compatibility scoring between two profiles.
//!
//! Every dimension yields a contribution in `[0, 1]`; the score is the
//! weighted sum of those contributions and the reason is the dimension with
//! the largest weighted term.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ConnectError, ConnectResult},
    profile::{Profile, TagCategory},
};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.30;
pub const SEMESTER_SPAN: f64 = 12.0;
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// A similarity dimension. Declaration order is the tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Course,
    ProfessionalInterests,
    Hobbies,
    Sports,
    Music,
    Leisure,
    Semester,
    ConnectionTypes,
}

impl Dimension {
    /// All dimensions, highest priority first.
    pub const ALL: [Dimension; 8] = [
        Dimension::Course,
        Dimension::ProfessionalInterests,
        Dimension::Hobbies,
        Dimension::Sports,
        Dimension::Music,
        Dimension::Leisure,
        Dimension::Semester,
        Dimension::ConnectionTypes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Course => "course",
            Dimension::ProfessionalInterests => "professional_interests",
            Dimension::Hobbies => "hobbies",
            Dimension::Sports => "sports",
            Dimension::Music => "music",
            Dimension::Leisure => "leisure",
            Dimension::Semester => "semester",
            Dimension::ConnectionTypes => "connection_types",
        }
    }

    fn tag_category(&self) -> Option<TagCategory> {
        match self {
            Dimension::ProfessionalInterests => Some(TagCategory::ProfessionalInterests),
            Dimension::Hobbies => Some(TagCategory::Hobbies),
            Dimension::Sports => Some(TagCategory::Sports),
            Dimension::Music => Some(TagCategory::MusicStyles),
            Dimension::Leisure => Some(TagCategory::LeisureVenues),
            _ => None,
        }
    }

    /// Unweighted contribution of this dimension, in `[0, 1]`.
    pub fn contribution(&self, a: &Profile, b: &Profile) -> f64 {
        if let Some(category) = self.tag_category() {
            return jaccard(a.comparable_tags(category), b.comparable_tags(category));
        }
        match self {
            Dimension::Course => {
                if a.course == b.course {
                    1.0
                } else {
                    0.0
                }
            }
            Dimension::Semester => semester_proximity(a.semester, b.semester),
            Dimension::ConnectionTypes => jaccard(&a.connection_types, &b.connection_types),
            _ => 0.0,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Jaccard index of two sets, 0 when both are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// `1 - |a - b| / 12`, clamped to `[0, 1]`.
pub fn semester_proximity(a: u32, b: u32) -> f64 {
    let gap = (f64::from(a) - f64::from(b)).abs();
    (1.0 - gap / SEMESTER_SPAN).clamp(0.0, 1.0)
}

/// Per-dimension weights. Must be non-negative and sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub course: f64,
    pub professional_interests: f64,
    pub hobbies: f64,
    pub sports: f64,
    pub music: f64,
    pub leisure: f64,
    pub semester: f64,
    pub connection_types: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            course: 0.25,
            professional_interests: 0.20,
            hobbies: 0.20,
            sports: 0.10,
            music: 0.10,
            leisure: 0.05,
            semester: 0.05,
            connection_types: 0.05,
        }
    }
}

impl SimilarityWeights {
    pub fn weight(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Course => self.course,
            Dimension::ProfessionalInterests => self.professional_interests,
            Dimension::Hobbies => self.hobbies,
            Dimension::Sports => self.sports,
            Dimension::Music => self.music,
            Dimension::Leisure => self.leisure,
            Dimension::Semester => self.semester,
            Dimension::ConnectionTypes => self.connection_types,
        }
    }

    pub fn with_weight(mut self, dimension: Dimension, weight: f64) -> Self {
        let slot = match dimension {
            Dimension::Course => &mut self.course,
            Dimension::ProfessionalInterests => &mut self.professional_interests,
            Dimension::Hobbies => &mut self.hobbies,
            Dimension::Sports => &mut self.sports,
            Dimension::Music => &mut self.music,
            Dimension::Leisure => &mut self.leisure,
            Dimension::Semester => &mut self.semester,
            Dimension::ConnectionTypes => &mut self.connection_types,
        };
        *slot = weight;
        self
    }

    pub fn validate(&self) -> ConnectResult<()> {
        let mut total = 0.0;
        for dimension in Dimension::ALL {
            let weight = self.weight(dimension);
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConnectError::Config {
                    message: format!("weight for {} must be a non-negative number, got {}", dimension, weight),
                });
            }
            total += weight;
        }
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConnectError::Config {
                message: format!("similarity weights must sum to 1, got {:.6}", total),
            });
        }
        Ok(())
    }
}

/// Scorer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    pub weights: SimilarityWeights,
    /// Minimum score for an edge.
    pub threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl SimilarityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: SimilarityWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> ConnectResult<()> {
        self.weights.validate()?;
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConnectError::Config {
                message: format!("similarity threshold must be within [0, 1], got {}", self.threshold),
            });
        }
        Ok(())
    }
}

/// Outcome of scoring one pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Similarity {
    pub score: f64,
    /// Dimension with the largest weighted term; `None` iff the score is 0.
    pub reason: Option<Dimension>,
}

/// Score two profiles.
pub fn score(a: &Profile, b: &Profile, weights: &SimilarityWeights) -> Similarity {
    let mut total = 0.0;
    let mut best: Option<(Dimension, f64)> = None;

    for dimension in Dimension::ALL {
        let term = weights.weight(dimension) * dimension.contribution(a, b);
        total += term;
        // Strict comparison keeps the higher-priority dimension on ties.
        if term > 0.0 && best.map_or(true, |(_, top)| term > top) {
            best = Some((dimension, term));
        }
    }

    let score = total.clamp(0.0, 1.0);
    if score == 0.0 {
        return Similarity { score, reason: None };
    }

    Similarity {
        score,
        reason: best.map(|(dimension, _)| dimension),
    }
}
