use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized idea text. Produced once per request by the normalizer and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Idea(String);

impl Idea {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl fmt::Display for Idea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An existing startup similar to the idea, in the rank order the model emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorRecord {
    pub name: String,
    pub description: String,
    pub category: String,
    /// Synthesized locally from rank, in `[1, 100]`.
    pub similarity: u8,
    pub website: Option<String>,
}

/// The six scored dimensions, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Uniqueness,
    Feasibility,
    MarketTrend,
    Scalability,
    ProblemRelevance,
    UserAdoptionPotential,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Uniqueness,
        Dimension::Feasibility,
        Dimension::MarketTrend,
        Dimension::Scalability,
        Dimension::ProblemRelevance,
        Dimension::UserAdoptionPotential,
    ];

    /// Key used in the model's JSON and in the catalog.
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Uniqueness => "uniqueness",
            Dimension::Feasibility => "feasibility",
            Dimension::MarketTrend => "market_trend",
            Dimension::Scalability => "scalability",
            Dimension::ProblemRelevance => "problem_relevance",
            Dimension::UserAdoptionPotential => "user_adoption_potential",
        }
    }
}

/// Integer scores in `[0, 10]` per dimension. `overall_score` is always the
/// local sum of the six, so its ceiling is 60 even though the prompt says "out of 100".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationScores {
    scores: [u8; 6],
    overall_score: u32,
}

impl ValidationScores {
    pub fn new(scores: [u8; 6]) -> Self {
        let scores = scores.map(|s| s.min(10));
        let overall_score = scores.iter().map(|&s| u32::from(s)).sum();
        Self {
            scores,
            overall_score,
        }
    }

    pub fn zeroed() -> Self {
        Self::new([0; 6])
    }

    pub fn get(&self, dimension: Dimension) -> u8 {
        self.scores[dimension as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, u8)> + '_ {
        Dimension::ALL.iter().map(|&d| (d, self.get(d)))
    }

    pub fn overall_score(&self) -> u32 {
        self.overall_score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Position-based: the first two items are high, the next two medium, the rest low.
    pub fn for_position(index: usize) -> Self {
        match index {
            0 | 1 => Priority::High,
            2 | 3 => Priority::Medium,
            _ => Priority::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionItem {
    pub category: String,
    pub tip: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub category: String,
    pub score: u32,
    pub explanation: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorView {
    pub name: String,
    pub description: String,
    pub website: String,
    pub category: String,
    pub similarity: f64,
}

/// Response document consumed by the frontend. Every field is always present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineResult {
    pub scores: Vec<ScoreEntry>,
    pub suggestions: Vec<SuggestionItem>,
    pub competitors: Vec<CompetitorView>,
    pub error: Option<String>,
}

impl PipelineResult {
    /// All slices empty, `error` populated.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
