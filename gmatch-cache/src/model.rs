// Cache data model
//
// Wire format is JSON under string keys:
//   queue:<user_id>            one QueueEntry per opted-in candidate
//   edge:<user_lo>:<user_hi>   one Edge per compatible pair, key canonicalized
//   match:gc:lock              scheduler leadership token

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key pattern matching every queue entry.
pub const QUEUE_PATTERN: &str = "queue:*";
/// Key pattern matching every edge.
pub const EDGE_PATTERN: &str = "edge:*";
/// Scheduler leadership lock key.
pub const LOCK_KEY: &str = "match:gc:lock";

/// The closed set of survey dimensions. Survey answers and weights are
/// validated against exactly this key set when a queue entry is decoded.
pub const SURVEY_DIMENSIONS: [&str; 19] = [
    "time_1", "time_2", "time_3", "time_4",
    "clean_1", "clean_2", "clean_3", "clean_4",
    "habit_1", "habit_2", "habit_3", "habit_4",
    "social_1", "social_2", "social_3", "social_4", "social_5",
    "etc_1", "etc_2",
];

pub const DIMENSION_COUNT: usize = SURVEY_DIMENSIONS.len();

pub fn queue_key(user_id: Uuid) -> String {
    format!("queue:{}", user_id)
}

/// Canonical pair ordering: the smaller UUID is always `user_a`.
pub fn canonical_pair(u: Uuid, v: Uuid) -> (Uuid, Uuid) {
    if u <= v {
        (u, v)
    } else {
        (v, u)
    }
}

/// Canonical edge key; `edge_key(u, v) == edge_key(v, u)` by construction.
pub fn edge_key(u: Uuid, v: Uuid) -> String {
    let (lo, hi) = canonical_pair(u, v);
    format!("edge:{}:{}", lo, hi)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

/// Roommate appliance preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MatePreference {
    DontCare,
    Prefer,
    Avoid,
}

impl TryFrom<u8> for MatePreference {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MatePreference::DontCare),
            1 => Ok(MatePreference::Prefer),
            2 => Ok(MatePreference::Avoid),
            other => Err(format!("mate preference {} outside 0..=2", other)),
        }
    }
}

impl From<MatePreference> for u8 {
    fn from(value: MatePreference) -> Self {
        value as u8
    }
}

/// Hard and soft profile attributes of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicProfile {
    pub gender: Gender,
    pub dorm_building: char,
    pub stay_period: u8,
    pub is_smoker: bool,
    pub has_fridge: bool,
    pub mate_fridge: MatePreference,
    pub has_router: bool,
    pub mate_router: MatePreference,
}

/// Survey answers over the closed dimension set, 1..=5 each. Stored as a
/// fixed array so scoring iterates a compile-time-sized slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, u8>", into = "BTreeMap<String, u8>")]
pub struct SurveyVector(pub [u8; DIMENSION_COUNT]);

impl TryFrom<BTreeMap<String, u8>> for SurveyVector {
    type Error = String;

    fn try_from(map: BTreeMap<String, u8>) -> Result<Self, Self::Error> {
        let mut values = [0u8; DIMENSION_COUNT];
        for (idx, dim) in SURVEY_DIMENSIONS.iter().enumerate() {
            let value = *map
                .get(*dim)
                .ok_or_else(|| format!("missing survey dimension {}", dim))?;
            if !(1..=5).contains(&value) {
                return Err(format!("survey answer {}={} outside 1..=5", dim, value));
            }
            values[idx] = value;
        }
        if map.len() != DIMENSION_COUNT {
            let unknown = map
                .keys()
                .find(|k| !SURVEY_DIMENSIONS.contains(&k.as_str()))
                .cloned()
                .unwrap_or_default();
            return Err(format!("unknown survey dimension {}", unknown));
        }
        Ok(SurveyVector(values))
    }
}

impl From<SurveyVector> for BTreeMap<String, u8> {
    fn from(vector: SurveyVector) -> Self {
        SURVEY_DIMENSIONS
            .iter()
            .zip(vector.0.iter())
            .map(|(dim, value)| (dim.to_string(), *value))
            .collect()
    }
}

/// Per-dimension weights over the same closed key set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct WeightVector(pub [f64; DIMENSION_COUNT]);

impl TryFrom<BTreeMap<String, f64>> for WeightVector {
    type Error = String;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut values = [0f64; DIMENSION_COUNT];
        for (idx, dim) in SURVEY_DIMENSIONS.iter().enumerate() {
            let value = *map
                .get(*dim)
                .ok_or_else(|| format!("missing weight dimension {}", dim))?;
            if !value.is_finite() || value < 0.0 {
                return Err(format!("weight {}={} is not a non-negative number", dim, value));
            }
            values[idx] = value;
        }
        if map.len() != DIMENSION_COUNT {
            let unknown = map
                .keys()
                .find(|k| !SURVEY_DIMENSIONS.contains(&k.as_str()))
                .cloned()
                .unwrap_or_default();
            return Err(format!("unknown weight dimension {}", unknown));
        }
        Ok(WeightVector(values))
    }
}

impl From<WeightVector> for BTreeMap<String, f64> {
    fn from(vector: WeightVector) -> Self {
        SURVEY_DIMENSIONS
            .iter()
            .zip(vector.0.iter())
            .map(|(dim, value)| (dim.to_string(), *value))
            .collect()
    }
}

/// One candidate's opt-in record in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub user_id: Uuid,
    pub property_id: i64,
    pub survey_id: i64,
    pub basic: BasicProfile,
    pub survey: SurveyVector,
    pub weights: WeightVector,
    /// Aging counter, incremented each scheduler cycle the entry survives.
    #[serde(default)]
    pub priority: u32,
    pub registered_at: DateTime<Utc>,
    /// Watermark set by the edge calculator once all edges against the
    /// already-processed population exist.
    #[serde(default)]
    pub edge_calculated: bool,
}

impl QueueEntry {
    pub fn key(&self) -> String {
        queue_key(self.user_id)
    }
}

/// Cached symmetric compatibility record between two candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Build an edge with endpoints in canonical order.
    pub fn new(u: Uuid, v: Uuid, score: f64, created_at: DateTime<Utc>) -> Self {
        let (user_a, user_b) = canonical_pair(u, v);
        Self {
            user_a,
            user_b,
            score,
            created_at,
        }
    }

    pub fn key(&self) -> String {
        edge_key(self.user_a, self.user_b)
    }
}
