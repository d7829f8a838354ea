//! Improvement suggestions that avoid what the competitors already do.
//!
//! Model text is split into blank-line separated sections, each section is
//! flattened to one line with bullet glyphs removed, and near-duplicate
//! sections are dropped in first-seen order.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use thinkbot_common::error::GatewayError;
use thinkbot_common::gateway::{ApiKey, ChatPrompt, Gateway};

use crate::model::{CompetitorRecord, Idea};

const SYSTEM_PROMPT: &str =
    "You are a startup mentor. Give only factual, actionable suggestions.";
const TEMPERATURE: f32 = 0.7;
/// Sections whose word-set Jaccard similarity exceeds this are duplicates.
const NEAR_DUPLICATE_THRESHOLD: f64 = 0.70;

const BULLET_GLYPHS: &[char] = &[
    '-', '*', '●', '•', '○', '◆', '◇', '■', '□', '▪', '▫', '►', '→', '\u{fe0f}',
];

static SECTION_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s*").expect("valid regex"));

pub struct IdeaEnhancer<'a> {
    gateway: &'a Gateway,
    api_key: &'a ApiKey,
}

impl<'a> IdeaEnhancer<'a> {
    pub fn new(gateway: &'a Gateway, api_key: &'a ApiKey) -> Self {
        Self { gateway, api_key }
    }

    pub async fn enhance(
        &self,
        idea: &Idea,
        competitors: &[CompetitorRecord],
    ) -> Result<String, GatewayError> {
        let prompt = ChatPrompt::new(SYSTEM_PROMPT, build_prompt(idea, competitors))
            .with_temperature(TEMPERATURE);
        let text = self
            .gateway
            .send_with(self.api_key, &prompt, clean_suggestions)
            .await?;
        info!(chars = text.len(), "suggestions generated");
        Ok(text)
    }
}

fn build_prompt(idea: &Idea, competitors: &[CompetitorRecord]) -> String {
    let listed = competitors
        .iter()
        .map(|c| format!("- {}: {}", c.name, c.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"User Idea:
{idea}

Competitors from Y Combinator:
{listed}

Task:
Based on the above competitor context, provide actionable, clear,
and realistic suggestions to improve the uniqueness and value of
the user's idea. Avoid hallucinations. Focus only on insights
that are not already covered by the listed competitors."#
    )
}

/// Flatten, clean and deduplicate model text. Nothing left over is `EmptyResponse`.
pub fn clean_suggestions(content: &str) -> Result<String, GatewayError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }

    let normalized = content.replace("\r\n", "\n");
    let mut kept: Vec<String> = Vec::new();
    for section in SECTION_BREAK.split(&normalized) {
        let Some(cleaned) = clean_section(section) else {
            continue;
        };
        if !kept.iter().any(|seen| is_near_duplicate(&cleaned, seen)) {
            kept.push(cleaned);
        }
    }

    if kept.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    Ok(kept.join("\n\n"))
}

fn clean_section(section: &str) -> Option<String> {
    let lines: Vec<String> = section
        .lines()
        .filter_map(|line| {
            let line = line.trim().replace("**", "");
            let line = LEADING_NUMBER.replace(&line, "");
            let line = line.trim_start_matches(|c: char| BULLET_GLYPHS.contains(&c) || c.is_whitespace());
            let line = line.trim();
            (!line.is_empty()).then(|| line.to_string())
        })
        .collect();

    (!lines.is_empty()).then(|| lines.join(" "))
}

/// Case-insensitive containment either way, or word Jaccard above the threshold.
pub fn is_near_duplicate(candidate: &str, seen: &str) -> bool {
    let candidate_lower = candidate.to_lowercase();
    let seen_lower = seen.to_lowercase();
    candidate_lower.contains(&seen_lower)
        || seen_lower.contains(&candidate_lower)
        || jaccard(&candidate_lower, &seen_lower) > NEAR_DUPLICATE_THRESHOLD
}

fn jaccard(a: &str, b: &str) -> f64 {
    let words_a = word_set(a);
    let words_b = word_set(b);
    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    words_a.intersection(&words_b).count() as f64 / union as f64
}

fn word_set(text: &str) -> HashSet<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use thinkbot_common::testing::{MockProvider, MockReply};

    use super::*;

    #[test]
    fn near_duplicate_by_word_overlap() {
        let first = "Focus on local sellers with same-day delivery";
        let second = "Focus on local sellers with same day delivery and marketing";
        assert!(jaccard(&first.to_lowercase(), &second.to_lowercase()) > 0.7);
        assert!(is_near_duplicate(second, first));
    }

    #[test]
    fn distinct_sections_are_not_duplicates() {
        assert!(!is_near_duplicate(
            "Offer a subscription tier for schools",
            "Partner with local libraries for exam prep"
        ));
    }

    #[test]
    fn substring_in_either_direction_is_duplicate() {
        assert!(is_near_duplicate("ADD A REFERRAL PROGRAM", "Add a referral program for tutors"));
        assert!(is_near_duplicate("Add a referral program for tutors", "add a referral program"));
    }

    #[test]
    fn keeps_first_seen_and_drops_later_duplicates() {
        let text = "Focus on local sellers with same-day delivery\n\n\
                    Focus on local sellers with same day delivery and marketing\n\n\
                    Build a loyalty program for repeat buyers";
        let cleaned = clean_suggestions(text).unwrap();
        assert_eq!(
            cleaned,
            "Focus on local sellers with same-day delivery\n\nBuild a loyalty program for repeat buyers"
        );
    }

    #[test]
    fn strips_bullets_and_numbering_and_joins_lines() {
        let text = "1. **Niche down**\n- Target exam prep\n• Start with one city\n\n2) Verify tutors";
        let cleaned = clean_suggestions(text).unwrap();
        assert_eq!(
            cleaned,
            "Niche down Target exam prep Start with one city\n\nVerify tutors"
        );
    }

    #[test]
    fn leading_plus_and_ellipsis_are_content() {
        let text = "- +20% retention via annual plans\n\n...and more pilots";
        let cleaned = clean_suggestions(text).unwrap();
        assert_eq!(cleaned, "+20% retention via annual plans\n\n...and more pilots");
    }

    #[test]
    fn jaccard_at_threshold_is_kept() {
        let first = "alpha bravo charlie delta echo foxtrot golf hotel india";
        let second = "alpha bravo charlie delta echo foxtrot golf juliet";
        assert_eq!(jaccard(first, second), 0.7);
        assert!(!is_near_duplicate(second, first));

        let cleaned = clean_suggestions(&format!("{first}\n\n{second}")).unwrap();
        assert_eq!(cleaned, format!("{first}\n\n{second}"));
    }

    #[test]
    fn blank_content_is_empty_response() {
        assert!(matches!(
            clean_suggestions("  \n\n "),
            Err(GatewayError::EmptyResponse)
        ));
        assert!(matches!(
            clean_suggestions("- \n\n* \n•"),
            Err(GatewayError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn prompt_lists_competitors() {
        let provider = MockProvider::start(vec![MockReply::content("Add group sessions")]).await;
        let gateway = Gateway::new(provider.gateway_config()).unwrap();
        let key = ApiKey::new("k");
        let competitors = vec![CompetitorRecord {
            name: "Wyzant".to_string(),
            description: "Tutor marketplace".to_string(),
            category: "EdTech".to_string(),
            similarity: 82,
            website: None,
        }];

        let text = IdeaEnhancer::new(&gateway, &key)
            .enhance(&Idea::new("tutor app"), &competitors)
            .await
            .unwrap();
        assert_eq!(text, "Add group sessions");

        let body = &provider.requests()[0].body;
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("- Wyzant: Tutor marketplace"));
        assert!(user.starts_with("User Idea:\ntutor app"));
    }
}
