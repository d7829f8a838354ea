//! Competitor discovery: asks the model for similar existing startups and
//! enriches each entry with a rank-based similarity and a keyword category.

use rand::Rng;
use serde_json::{Map, Value};
use tracing::info;

use thinkbot_common::error::GatewayError;
use thinkbot_common::gateway::{ApiKey, ChatPrompt, Gateway};
use thinkbot_common::json_extract::extract_json_object;

use crate::catalog::Catalog;
use crate::model::{CompetitorRecord, Idea};

const SYSTEM_PROMPT: &str = "You are a startup competitor research agent.";
const REQUESTED_COMPETITORS: usize = 10;
const TEMPERATURE: f32 = 0.7;

/// An entry as the model returned it, before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCompetitor {
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub website: Option<String>,
}

pub struct CompetitorFinder<'a> {
    gateway: &'a Gateway,
    api_key: &'a ApiKey,
    catalog: &'a Catalog,
}

impl<'a> CompetitorFinder<'a> {
    pub fn new(gateway: &'a Gateway, api_key: &'a ApiKey, catalog: &'a Catalog) -> Self {
        Self {
            gateway,
            api_key,
            catalog,
        }
    }

    pub async fn find(&self, idea: &Idea) -> Result<Vec<CompetitorRecord>, GatewayError> {
        let prompt =
            ChatPrompt::new(SYSTEM_PROMPT, build_prompt(idea)).with_temperature(TEMPERATURE);
        let raw = self
            .gateway
            .send_with(self.api_key, &prompt, parse_competitors)
            .await?;
        info!(competitors = raw.len(), "competitors discovered");
        let records = {
            let mut rng = rand::thread_rng();
            enrich(raw, self.catalog, &mut rng)
        };
        Ok(records)
    }
}

fn build_prompt(idea: &Idea) -> String {
    format!(
        r#"Use the COSTAR framework to analyze and suggest similar startup ideas.

C (Context):
The user has a product idea and wants to explore similar startups from Y Combinator.
The input idea has already been preprocessed for clarity.
Input Idea: "{idea}"

O (Objective):
Identify {REQUESTED_COMPETITORS} real competitors or highly similar ideas from Y Combinator's startup directory.
Each result must include:
- idea_name: Name of the startup
- idea_description: Simple, clear explanation of what they actually do (one or two lines max).

S (Style):
Keep the results structured, concise, and easy to read.
Avoid long paragraphs. Stick to factual summaries.

T (Tone):
Professional, informative, and startup-research oriented.
Avoid marketing fluff, use neutral descriptive tone.

A (Audience):
Startup founders, students, and innovators who want to understand competitors
or validate their idea against real YC companies.

R (Response):
Return output in strict JSON format with a list of objects.
Each object must contain only:
- "idea_name"
- "idea_description"

Example JSON structure:
{{
  "similar_ideas": [
    {{
      "idea_name": "Startup X",
      "idea_description": "Helps users track expenses automatically using AI."
    }},
    {{
      "idea_name": "Startup Y",
      "idea_description": "Provides a platform for farmers to sell produce directly to consumers."
    }}
  ]
}}

Now, based on the given user idea, return exactly {REQUESTED_COMPETITORS} similar startup ideas in this JSON format."#
    )
}

/// Keep entries with a non-empty name and description. Zero survivors is a
/// retryable failure so the gateway asks again.
pub fn parse_competitors(content: &str) -> Result<Vec<RawCompetitor>, GatewayError> {
    let obj = extract_json_object(content)?;
    let entries = obj
        .get("similar_ideas")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let valid: Vec<RawCompetitor> = entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            Some(RawCompetitor {
                name: non_empty_str(entry, "idea_name")?,
                description: non_empty_str(entry, "idea_description")?,
                category: non_empty_str(entry, "category"),
                website: non_empty_str(entry, "website"),
            })
        })
        .collect();

    if valid.is_empty() {
        return Err(GatewayError::MalformedResponse(
            "No valid ideas found in response".to_string(),
        ));
    }
    Ok(valid)
}

fn non_empty_str(entry: &Map<String, Value>, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `clamp(1, 100, round(max(85 - 10 * rank, 25) + jitter))` with jitter in `[-5, 5]`.
pub fn similarity_for_rank(rank: usize, jitter: f64) -> u8 {
    let step = i64::try_from(rank).unwrap_or(i64::MAX).saturating_mul(10);
    let baseline = 85i64.saturating_sub(step).max(25) as f64;
    let jitter = jitter.clamp(-5.0, 5.0);
    (baseline + jitter).round_ties_even().clamp(1.0, 100.0) as u8
}

pub fn enrich<R: Rng + ?Sized>(
    raw: Vec<RawCompetitor>,
    catalog: &Catalog,
    rng: &mut R,
) -> Vec<CompetitorRecord> {
    raw.into_iter()
        .enumerate()
        .map(|(rank, entry)| {
            let similarity = similarity_for_rank(rank, rng.gen_range(-5.0..=5.0));
            let category = entry
                .category
                .unwrap_or_else(|| catalog.categorize(&entry.description).to_string());
            CompetitorRecord {
                name: entry.name,
                description: entry.description,
                category,
                similarity,
                website: entry.website,
            }
        })
        .collect()
}
