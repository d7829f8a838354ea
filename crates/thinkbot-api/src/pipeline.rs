//! Runs normalize -> competitors -> validation -> enhancement for one upload
//! and reshapes the stage outputs into the frontend's response document.
//!
//! Competitors are discovered once and passed by reference to the validator
//! and enhancer, so all three stages see the same list. Each agent stage that
//! fails degrades to its own empty slice with an error message; a document
//! that cannot be read fails the whole run.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{info, warn};

use thinkbot_common::error::GatewayError;
use thinkbot_common::gateway::{ApiKey, Gateway};

use crate::catalog::{Catalog, DEFAULT_CATEGORY};
use crate::competitors::CompetitorFinder;
use crate::document::Normalizer;
use crate::enhancer::IdeaEnhancer;
use crate::model::{
    CompetitorRecord, CompetitorView, Idea, PipelineResult, Priority, ScoreEntry, SuggestionItem,
    ValidationScores,
};
use crate::validator::IdeaValidator;

const SUGGESTION_CATEGORY: &str = "Enhancement";

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("valid regex"));

/// Result of one agent stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Completed(T),
    /// The stage gave up; `fallback` is its well-shaped empty value.
    Degraded { fallback: T, error: String },
}

impl<T> StageOutcome<T> {
    fn from_result(
        stage: &str,
        result: Result<T, GatewayError>,
        fallback: impl FnOnce() -> T,
    ) -> Self {
        match result {
            Ok(value) => StageOutcome::Completed(value),
            Err(e) => {
                warn!(stage, error = %e, "stage degraded");
                StageOutcome::Degraded {
                    fallback: fallback(),
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Completed(value) => value,
            StageOutcome::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StageOutcome::Completed(_) => None,
            StageOutcome::Degraded { error, .. } => Some(error.as_str()),
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Completed(value) => value,
            StageOutcome::Degraded { fallback, .. } => fallback,
        }
    }
}

/// Per-stage outcomes of one run, before display conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub competitors: StageOutcome<Vec<CompetitorRecord>>,
    pub validation: StageOutcome<ValidationScores>,
    pub suggestions: StageOutcome<String>,
}

impl StageReport {
    /// `None` when every stage completed, otherwise `stage: error` pairs joined by "; ".
    pub fn error_summary(&self) -> Option<String> {
        let errors: Vec<String> = [
            ("competitors", self.competitors.error()),
            ("validation", self.validation.error()),
            ("suggestions", self.suggestions.error()),
        ]
        .into_iter()
        .filter_map(|(stage, error)| error.map(|e| format!("{stage}: {e}")))
        .collect();

        (!errors.is_empty()).then(|| errors.join("; "))
    }
}

#[derive(Clone)]
pub struct Pipeline {
    gateway: Arc<Gateway>,
    catalog: Arc<Catalog>,
    normalizer: Arc<Normalizer>,
}

impl Pipeline {
    pub fn new(gateway: Arc<Gateway>, catalog: Arc<Catalog>, normalizer: Arc<Normalizer>) -> Self {
        Self {
            gateway,
            catalog,
            normalizer,
        }
    }

    /// Full run for an uploaded document. Never fails; problems land in `error`.
    pub async fn run(&self, file_name: &str, bytes: &[u8], api_key: &ApiKey) -> PipelineResult {
        info!(file_name, bytes = bytes.len(), "pipeline started");
        let idea = match self.normalizer.load_idea(file_name, bytes) {
            Ok(idea) => idea,
            Err(e) => {
                warn!(file_name, error = %e, "document rejected");
                return PipelineResult::failed(format!("Pipeline error: {e}"));
            }
        };

        let report = self.run_stages(&idea, api_key).await;
        let result = self.assemble(report);
        info!(
            scores = result.scores.len(),
            suggestions = result.suggestions.len(),
            competitors = result.competitors.len(),
            degraded = result.error.is_some(),
            "pipeline finished"
        );
        result
    }

    pub async fn run_stages(&self, idea: &Idea, api_key: &ApiKey) -> StageReport {
        info!("finding competitors");
        let competitors = CompetitorFinder::new(&self.gateway, api_key, &self.catalog)
            .find(idea)
            .await;
        let competitors = StageOutcome::from_result("competitors", competitors, Vec::new);

        info!("validating idea");
        let validation = IdeaValidator::new(&self.gateway, api_key)
            .validate(idea, competitors.value())
            .await;
        let validation =
            StageOutcome::from_result("validation", validation, ValidationScores::zeroed);

        info!("enhancing idea");
        let suggestions = IdeaEnhancer::new(&self.gateway, api_key)
            .enhance(idea, competitors.value())
            .await;
        let suggestions = StageOutcome::from_result("suggestions", suggestions, String::new);

        StageReport {
            competitors,
            validation,
            suggestions,
        }
    }

    pub fn assemble(&self, report: StageReport) -> PipelineResult {
        let error = report.error_summary();
        PipelineResult {
            scores: score_entries(report.validation.value(), &self.catalog),
            suggestions: suggestion_items(report.suggestions.value()),
            competitors: report
                .competitors
                .into_value()
                .into_iter()
                .map(competitor_view)
                .collect(),
            error,
        }
    }
}

/// Dimensions without a catalog mapping are skipped.
pub fn score_entries(scores: &ValidationScores, catalog: &Catalog) -> Vec<ScoreEntry> {
    scores
        .iter()
        .filter_map(|(dim, raw)| {
            let mapping = catalog.score_mapping(dim.key())?;
            Some(ScoreEntry {
                category: mapping.category.clone(),
                score: u32::from(raw) * 10,
                explanation: mapping.explanation.clone(),
                color: mapping.color.clone(),
            })
        })
        .collect()
}

/// One item per non-blank line; priority comes from position alone.
pub fn suggestion_items(text: &str) -> Vec<SuggestionItem> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| LEADING_NUMBER.replace(line, "").trim().to_string())
        .filter(|tip| !tip.is_empty())
        .enumerate()
        .map(|(i, tip)| SuggestionItem {
            category: SUGGESTION_CATEGORY.to_string(),
            tip,
            priority: Priority::for_position(i),
        })
        .collect()
}

pub fn competitor_view(record: CompetitorRecord) -> CompetitorView {
    let category = if record.category.trim().is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        record.category
    };
    CompetitorView {
        name: record.name,
        description: record.description,
        website: record.website.unwrap_or_default(),
        category,
        similarity: f64::from(record.similarity),
    }
}
