//! Turns raw query text into the clause set a BM25 backend expects:
//! a primary multi-field match, an optional phrase boost, and a
//! minimum-should-match policy for short, precise queries.

const SHORT_QUERY_TOKEN_THRESHOLD: usize = 3;
const DEFAULT_FIELDS: &[&str] = &["title^2", "content", "tags"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bm25Clause {
    pub fields: Vec<String>,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedQuery {
    pub bm25_clause: Bm25Clause,
    pub phrase_boost: Option<String>,
    pub minimum_should_match: MinimumShouldMatch,
    pub token_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimumShouldMatch {
    /// Require every content token to match — used for short, precise
    /// queries where recall-at-any-cost produces sludge.
    All,
    /// Percentage (0..=100) of tokens that must match.
    Percent(u8),
}

pub struct TextProcessor {
    fields: Vec<String>,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self {
            fields: DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TextProcessor {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn process(&self, raw: &str) -> ProcessedQuery {
        let trimmed = raw.trim();
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let token_count = tokens.len();

        let phrase_boost = if token_count >= 2 && token_count <= 6 {
            Some(trimmed.to_string())
        } else {
            None
        };

        let minimum_should_match = if token_count <= SHORT_QUERY_TOKEN_THRESHOLD {
            MinimumShouldMatch::All
        } else {
            MinimumShouldMatch::Percent(75)
        };

        ProcessedQuery {
            bm25_clause: Bm25Clause {
                fields: self.fields.clone(),
                query: trimmed.to_string(),
            },
            phrase_boost,
            minimum_should_match,
            token_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_queries_require_every_token() {
        let processed = TextProcessor::default().process("rust macros");
        assert_eq!(processed.minimum_should_match, MinimumShouldMatch::All);
    }

    #[test]
    fn longer_queries_relax_the_match_requirement() {
        let processed =
            TextProcessor::default().process("how do I configure the rate limiter for Slack search");
        assert_eq!(
            processed.minimum_should_match,
            MinimumShouldMatch::Percent(75)
        );
    }

    #[test]
    fn deterministic_for_identical_input() {
        let tp = TextProcessor::default();
        assert_eq!(tp.process("hybrid search"), tp.process("hybrid search"));
    }

    #[test]
    fn single_word_queries_have_no_phrase_boost() {
        let processed = TextProcessor::default().process("deployment");
        assert_eq!(processed.phrase_boost, None);
    }
}
