//! Query complexity classification and output budgets.
//!
//! Short lookups get a tiny, low-temperature budget; anything long or
//! containing a depth keyword gets the full analytical budget.

use finrag_config::{BudgetConfig, GenerationConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryComplexity {
    Simple,
    Complex,
}

impl QueryComplexity {
    /// The answer-style line placed right after the persona.
    pub fn style_hint(self) -> &'static str {
        match self {
            QueryComplexity::Simple => "BE EXTREMELY CONCISE (max 2 sentences) and answer directly.",
            QueryComplexity::Complex => "Provide a detailed, reasoned, and analytical argumentation.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryComplexity::Simple => "simple",
            QueryComplexity::Complex => "complex",
        }
    }
}

impl std::fmt::Display for QueryComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides [`QueryComplexity`] from length and keywords.
#[derive(Debug, Clone)]
pub struct ComplexityClassifier {
    char_threshold: usize,
    keywords: Vec<String>,
}

impl ComplexityClassifier {
    pub fn new(char_threshold: usize, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            char_threshold,
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.simple_char_threshold, config.complex_keywords.iter().cloned())
    }

    /// Simple iff shorter than the threshold (in characters) and free of
    /// every keyword (case-insensitive substring match).
    pub fn classify(&self, query: &str) -> QueryComplexity {
        if query.chars().count() >= self.char_threshold {
            return QueryComplexity::Complex;
        }
        let lower = query.to_lowercase();
        if self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            QueryComplexity::Complex
        } else {
            QueryComplexity::Simple
        }
    }
}

impl Default for ComplexityClassifier {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}

/// Output budget for one generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationBudget {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl From<BudgetConfig> for GenerationBudget {
    fn from(c: BudgetConfig) -> Self {
        Self {
            max_output_tokens: c.max_output_tokens,
            temperature: c.temperature,
        }
    }
}

/// The budget a grounded answer of this complexity gets.
pub fn budget_for(complexity: QueryComplexity, config: &GenerationConfig) -> GenerationBudget {
    match complexity {
        QueryComplexity::Simple => config.simple.into(),
        QueryComplexity::Complex => config.complex.into(),
    }
}

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up. Only used for logging.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lookup_is_simple() {
        let c = ComplexityClassifier::default();
        assert_eq!(c.classify("What is KYC?"), QueryComplexity::Simple);
    }

    #[test]
    fn keywords_make_it_complex() {
        let c = ComplexityClassifier::default();
        assert_eq!(
            c.classify("Explain the difference between term and whole life insurance in detail"),
            QueryComplexity::Complex
        );
        // Short, but contains a keyword.
        assert_eq!(c.classify("List ELSS funds"), QueryComplexity::Complex);
        assert_eq!(c.classify("COMPARE PPF and NPS"), QueryComplexity::Complex);
    }

    #[test]
    fn length_threshold_is_exclusive() {
        let c = ComplexityClassifier::default();
        let just_under = "a".repeat(49);
        let at = "a".repeat(50);
        assert_eq!(c.classify(&just_under), QueryComplexity::Simple);
        assert_eq!(c.classify(&at), QueryComplexity::Complex);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let c = ComplexityClassifier::default();
        // 30 characters, 90 bytes.
        let query = "₹".repeat(30);
        assert_eq!(c.classify(&query), QueryComplexity::Simple);
    }

    #[test]
    fn budgets_follow_complexity() {
        let config = GenerationConfig::default();
        let simple = budget_for(QueryComplexity::Simple, &config);
        assert_eq!(simple.max_output_tokens, 50);
        assert!((simple.temperature - 0.1).abs() < f32::EPSILON);

        let complex = budget_for(QueryComplexity::Complex, &config);
        assert_eq!(complex.max_output_tokens, 1000);
        assert!((complex.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn style_hints_differ() {
        assert!(QueryComplexity::Simple.style_hint().contains("max 2 sentences"));
        assert!(QueryComplexity::Complex.style_hint().contains("analytical"));
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("test"), 1);
        assert_eq!(estimate_tokens("hello"), 2);
    }
}
