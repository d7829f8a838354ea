//! Idea validation: six rubric scores in `[0, 10]` using the discovered
//! competitors as market context.
//!
//! The model's own rounding and `overall_score` are never trusted; scores are
//! rounded here and the aggregate is recomputed as their sum.

use serde_json::Value;
use tracing::info;

use thinkbot_common::error::GatewayError;
use thinkbot_common::gateway::{ApiKey, ChatPrompt, Gateway};
use thinkbot_common::json_extract::extract_json_object;

use crate::model::{CompetitorRecord, Dimension, Idea, ValidationScores};

const SYSTEM_PROMPT: &str = "You are a startup validation assistant.";
const CONTEXT_COMPETITORS: usize = 3;

pub struct IdeaValidator<'a> {
    gateway: &'a Gateway,
    api_key: &'a ApiKey,
}

impl<'a> IdeaValidator<'a> {
    pub fn new(gateway: &'a Gateway, api_key: &'a ApiKey) -> Self {
        Self { gateway, api_key }
    }

    pub async fn validate(
        &self,
        idea: &Idea,
        competitors: &[CompetitorRecord],
    ) -> Result<ValidationScores, GatewayError> {
        let context = MarketContext::from_competitors(competitors);
        let prompt = ChatPrompt::new(SYSTEM_PROMPT, build_prompt(idea, &context));
        let scores = self
            .gateway
            .send_with(self.api_key, &prompt, parse_scores)
            .await?;
        info!(overall_score = scores.overall_score(), "idea validated");
        Ok(scores)
    }
}

/// Summary of the competitor list that goes into the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketContext<'a> {
    pub average_similarity: f64,
    pub top: Vec<&'a CompetitorRecord>,
}

impl<'a> MarketContext<'a> {
    pub fn from_competitors(competitors: &'a [CompetitorRecord]) -> Self {
        let average_similarity = if competitors.is_empty() {
            0.0
        } else {
            let total: f64 = competitors.iter().map(|c| f64::from(c.similarity)).sum();
            total / competitors.len() as f64
        };

        let mut top: Vec<&CompetitorRecord> = competitors.iter().collect();
        top.sort_by(|a, b| b.similarity.cmp(&a.similarity));
        top.truncate(CONTEXT_COMPETITORS);

        Self {
            average_similarity,
            top,
        }
    }
}

fn build_prompt(idea: &Idea, context: &MarketContext<'_>) -> String {
    let overview = context
        .top
        .iter()
        .map(|c| format!("- {}: {} (Similarity: {}%)", c.name, c.description, c.similarity))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"As a startup validation expert, use the COSTAR framework to provide a detailed numerical assessment of this startup idea.
You must provide specific numerical scores for each criterion. Scores MUST be between 0-10.

C (Context):
Startup Idea: "{idea}"

Market Research:
- Average Competitor Similarity: {average:.1}%
- Competition Overview:
{overview}

O (Objective):
Score each dimension from 0-10 using these specific criteria:

1. Uniqueness Score (0-10):
- Score 9-10: Highly unique, no direct competitors
- Score 7-8: Novel approach in existing market
- Score 5-6: Differentiated from competitors
- Score 3-4: Similar to existing solutions
- Score 1-2: Very similar to competitors
Base this INVERSELY on competitor similarity: Higher similarity = LOWER score

2. Feasibility Score (0-10):
- Technical complexity (3 points)
- Resource requirements (4 points)
- Implementation timeline (3 points)
Add points based on realistic implementation potential

3. Market Trend Score (0-10):
- Growing market (4 points)
- Technology readiness (3 points)
- User adoption readiness (3 points)
Add points based on market timing and trends

4. Scalability Score (0-10):
- Market size potential (4 points)
- Geographic expansion possible (3 points)
- Revenue scaling potential (3 points)
Add points based on growth potential

5. Problem Relevance Score (0-10):
- Pain point severity (4 points)
- Target market size (3 points)
- Problem urgency (3 points)
Add points based on problem importance

6. User Adoption Score (0-10):
- Value proposition clarity (3 points)
- Ease of adoption (4 points)
- User benefit ratio (3 points)
Add points based on likely user acceptance

S (Style):
- Use structured analysis, be concise and clear.
- Focus on providing scores rather than long paragraphs.
- Keep each score strictly numeric (0-10).

T (Tone):
Professional, objective, and evaluation-focused.
Avoid exaggeration or marketing tone.

A (Audience):
Startup founders, product managers, and investors looking to validate startup ideas.

R (Response):
Return output in strict JSON format:
{{
  "validation_scores": {{
    "uniqueness": <score_out_of_10>,
    "feasibility": <score_out_of_10>,
    "market_trend": <score_out_of_10>,
    "scalability": <score_out_of_10>,
    "problem_relevance": <score_out_of_10>,
    "user_adoption_potential": <score_out_of_10>
  }},
  "overall_score": <total_score_out_of_100>
}}

Rules:
- Base uniqueness and market_trend scores INVERSELY on competitor similarity
- Higher similarity = LOWER uniqueness score
- Higher similarity = LOWER market opportunity score
- Each attribute must have an integer score from 0 to 10
- "overall_score" must be the sum of all attributes, out of 100
- Do not include explanations, only return JSON
- Ensure scores reflect the competitive landscape accurately"#,
        average = context.average_similarity,
    )
}

/// All six dimensions must be present and numeric in `[0, 10]`; anything else is
/// `InvalidScores`, which the gateway retries.
pub fn parse_scores(content: &str) -> Result<ValidationScores, GatewayError> {
    let obj = extract_json_object(content)?;
    let block = obj
        .get("validation_scores")
        .and_then(Value::as_object)
        .ok_or_else(|| GatewayError::InvalidScores("missing validation_scores".to_string()))?;

    let mut scores = [0u8; 6];
    for dim in Dimension::ALL {
        let value = block
            .get(dim.key())
            .ok_or_else(|| GatewayError::InvalidScores(format!("missing {}", dim.key())))?;
        let number = as_number(value).ok_or_else(|| {
            GatewayError::InvalidScores(format!("{} is not a number: {value}", dim.key()))
        })?;
        if !(0.0..=10.0).contains(&number) {
            return Err(GatewayError::InvalidScores(format!(
                "{} out of range: {number}",
                dim.key()
            )));
        }
        scores[dim as usize] = number.round_ties_even() as u8;
    }
    Ok(ValidationScores::new(scores))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}
