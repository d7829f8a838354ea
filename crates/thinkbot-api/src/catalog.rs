//! Static lookup tables: how each score dimension is presented, and the
//! keyword table used to categorize competitors.
//!
//! Built once at startup and shared read-only behind an `Arc`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreMapping {
    /// Dimension key, e.g. "market_trend".
    pub key: String,
    pub category: String,
    pub explanation: String,
    /// Tailwind gradient classes used by the frontend.
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub score_mappings: Vec<ScoreMapping>,
    /// Declaration order breaks ties between equally matching categories.
    pub categories: Vec<CategoryRule>,
}

impl Catalog {
    pub fn builtin() -> Self {
        let score_mappings = [
            (
                "uniqueness",
                "Uniqueness",
                "How original the idea is compared to existing solutions",
                "from-purple-400 to-pink-500",
            ),
            (
                "feasibility",
                "Feasibility",
                "Practicality of building and executing the idea",
                "from-green-400 to-emerald-500",
            ),
            (
                "market_trend",
                "Market Trend",
                "Alignment with current and emerging market trends",
                "from-blue-400 to-indigo-500",
            ),
            (
                "scalability",
                "Scalability",
                "Ability to expand and grow at larger scale",
                "from-orange-400 to-red-500",
            ),
            (
                "problem_relevance",
                "Problem Relevance",
                "Importance of the problem being solved",
                "from-cyan-400 to-blue-500",
            ),
            (
                "user_adoption_potential",
                "User Adoption",
                "Likelihood that users will adopt this solution",
                "from-yellow-400 to-orange-500",
            ),
        ]
        .into_iter()
        .map(|(key, category, explanation, color)| ScoreMapping {
            key: key.to_string(),
            category: category.to_string(),
            explanation: explanation.to_string(),
            color: color.to_string(),
        })
        .collect();

        let categories: [(&str, &[&str]); 10] = [
            ("E-commerce", &["shop", "retail", "store", "marketplace", "commerce", "sell"]),
            ("FinTech", &["payment", "finance", "bank", "invest", "money", "trading"]),
            ("EdTech", &["education", "learn", "teach", "student", "school", "course"]),
            ("HealthTech", &["health", "medical", "wellness", "fitness", "doctor", "patient"]),
            ("AI/ML", &["ai", "machine learning", "artificial intelligence", "predict", "automate"]),
            ("SaaS", &["software", "platform", "service", "cloud", "subscription"]),
            ("Enterprise", &["business", "enterprise", "corporate", "company", "organization"]),
            ("Consumer", &["user", "consumer", "personal", "individual", "customer"]),
            ("Mobile", &["app", "mobile", "phone", "ios", "android"]),
            ("IoT", &["iot", "device", "sensor", "hardware", "smart home"]),
        ];
        let categories = categories
            .into_iter()
            .map(|(name, keywords)| CategoryRule {
                name: name.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            })
            .collect();

        Self {
            score_mappings,
            categories,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&raw)
            .map_err(|e| AppError::Catalog(format!("{}: {e}", path.display())))?;
        if catalog.categories.iter().any(|c| c.keywords.is_empty()) {
            return Err(AppError::Catalog(format!(
                "{}: every category needs at least one keyword",
                path.display()
            )));
        }
        Ok(catalog)
    }

    pub fn score_mapping(&self, key: &str) -> Option<&ScoreMapping> {
        self.score_mappings.iter().find(|m| m.key == key)
    }

    /// Category whose keywords appear most often in `description`.
    ///
    /// Keywords match as case-insensitive substrings, so "ai" also hits "retail".
    /// Ties go to the earlier category; no hits yields [`DEFAULT_CATEGORY`].
    pub fn categorize(&self, description: &str) -> &str {
        let description = description.to_lowercase();
        let mut best = DEFAULT_CATEGORY;
        let mut best_hits = 0;

        for rule in &self.categories {
            let hits = rule
                .keywords
                .iter()
                .filter(|k| description.contains(k.to_lowercase().as_str()))
                .count();
            if hits > best_hits {
                best_hits = hits;
                best = rule.name.as_str();
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_maps_all_six_dimensions() {
        let catalog = Catalog::builtin();
        for dim in crate::model::Dimension::ALL {
            assert!(catalog.score_mapping(dim.key()).is_some(), "{}", dim.key());
        }
        assert_eq!(
            catalog.score_mapping("user_adoption_potential").unwrap().category,
            "User Adoption"
        );
    }

    #[test]
    fn categorize_picks_most_keyword_hits() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.categorize("Online school where students learn to teach"),
            "EdTech"
        );
        assert_eq!(
            catalog.categorize("Payment rails for banks moving money"),
            "FinTech"
        );
    }

    #[test]
    fn categorize_breaks_ties_by_declaration_order() {
        let catalog = Catalog::builtin();
        // One hit each: E-commerce ("shop"), AI/ML ("ai" inside "repair"), Mobile ("phone").
        assert_eq!(catalog.categorize("Phone repair shop"), "E-commerce");
    }

    #[test]
    fn categorize_is_case_insensitive() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.categorize("HEALTH and FITNESS tracking"), "HealthTech");
    }

    #[test]
    fn categorize_defaults_to_general() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.categorize("Handmade pottery for weekend hobbyists"),
            DEFAULT_CATEGORY
        );
    }

    #[test]
    fn loads_catalog_from_file() {
        let dir = std::env::temp_dir().join(format!("thinkbot-catalog-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("catalog.json");
        std::fs::write(
            &path,
            r#"{"score_mappings": [], "categories": [{"name": "Pets", "keywords": ["dog"]}]}"#,
        )
        .unwrap();

        let catalog = Catalog::from_file(&path).unwrap();
        assert_eq!(catalog.categorize("Dog walking on demand"), "Pets");
        assert!(catalog.score_mapping("uniqueness").is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
