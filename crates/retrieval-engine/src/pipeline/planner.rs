use std::sync::Arc;

use retrieval_types::RetrievalError;
use serde::Deserialize;

use crate::adapters::{ChatCompletionClient, ChatTurn};

const PLANNER_SYSTEM_PROMPT: &str = "You turn a user's question into short chat-search phrases. \
Respond with a JSON array of strings only, no prose, no code fences.";

const SUFFICIENCY_SYSTEM_PROMPT: &str = "You judge whether retrieved chat context answers a \
user's question. Respond with a single JSON object only: \
{\"is_sufficient\": bool, \"missing_info\": [string], \"reasoning\": string, \"confidence\": number 0..1}.";

#[derive(Debug, Clone, Deserialize)]
pub struct SufficiencyVerdict {
    pub is_sufficient: bool,
    #[serde(default)]
    pub missing_info: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    0.5
}

/// Wraps a chat-completion client with the two LLM roles the pipeline
/// needs: generating search phrases, and judging whether the context
/// gathered so far answers the question.
pub struct LlmQueryPlanner {
    client: Arc<dyn ChatCompletionClient>,
}

impl LlmQueryPlanner {
    pub fn new(client: Arc<dyn ChatCompletionClient>) -> Self {
        Self { client }
    }

    /// First-iteration query generation.
    pub async fn plan(&self, question: &str, count: usize) -> Result<Vec<String>, RetrievalError> {
        let prompt = format!(
            "Generate up to {count} short chat-search phrases that would help answer: \"{question}\""
        );
        let turns = [ChatTurn::system(PLANNER_SYSTEM_PROMPT), ChatTurn::user(prompt)];
        let response = self.client.complete(&turns).await?;
        parse_query_list(&response)
    }

    /// Later-iteration query generation, informed by what the previous
    /// sufficiency check said was still missing.
    pub async fn replan(
        &self,
        question: &str,
        count: usize,
        missing_info: &[String],
    ) -> Result<Vec<String>, RetrievalError> {
        let missing = if missing_info.is_empty() {
            "nothing specific was flagged as missing".to_string()
        } else {
            missing_info.join("; ")
        };
        let prompt = format!(
            "The previous search for \"{question}\" did not find enough. Still missing: {missing}. \
Generate up to {count} different short chat-search phrases to try next."
        );
        let turns = [ChatTurn::system(PLANNER_SYSTEM_PROMPT), ChatTurn::user(prompt)];
        let response = self.client.complete(&turns).await?;
        parse_query_list(&response)
    }

    pub async fn check_sufficiency(
        &self,
        question: &str,
        context: &str,
    ) -> Result<SufficiencyVerdict, RetrievalError> {
        let prompt = format!("Question: {question}\n\nGathered context:\n{context}");
        let turns = [
            ChatTurn::system(SUFFICIENCY_SYSTEM_PROMPT),
            ChatTurn::user(prompt),
        ];
        let response = self.client.complete(&turns).await?;
        parse_verdict(&response)
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed.strip_prefix("```") {
        let inner = inner.strip_prefix("json").unwrap_or(inner);
        inner.trim().trim_end_matches("```").trim()
    } else {
        trimmed
    }
}

fn parse_query_list(raw: &str) -> Result<Vec<String>, RetrievalError> {
    let cleaned = strip_code_fence(raw);
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Vec<String>>(cleaned) {
        Ok(list) => Ok(list.into_iter().filter(|q| !q.trim().is_empty()).collect()),
        Err(_) => Ok(Vec::new()),
    }
}

fn parse_verdict(raw: &str) -> Result<SufficiencyVerdict, RetrievalError> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str(cleaned).or_else(|_| {
        Ok(SufficiencyVerdict {
            is_sufficient: false,
            missing_info: vec!["evaluation failed".to_string()],
            reasoning: "could not parse sufficiency response".to_string(),
            confidence: 0.0,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_json_array() {
        let queries = parse_query_list(r#"["deployment guide", "rollback steps"]"#).unwrap();
        assert_eq!(queries, vec!["deployment guide", "rollback steps"]);
    }

    #[test]
    fn strips_code_fences_before_parsing() {
        let queries = parse_query_list("```json\n[\"a\", \"b\"]\n```").unwrap();
        assert_eq!(queries, vec!["a", "b"]);
    }

    #[test]
    fn unparseable_plan_yields_empty_not_error() {
        let queries = parse_query_list("sorry, I can't help with that").unwrap();
        assert!(queries.is_empty());
    }

    #[test]
    fn unparseable_verdict_degrades_to_insufficient() {
        let verdict = parse_verdict("not json at all").unwrap();
        assert!(!verdict.is_sufficient);
        assert_eq!(verdict.missing_info, vec!["evaluation failed".to_string()]);
    }

    #[test]
    fn parses_a_well_formed_verdict() {
        let verdict = parse_verdict(
            r#"{"is_sufficient": true, "missing_info": [], "reasoning": "ok", "confidence": 0.9}"#,
        )
        .unwrap();
        assert!(verdict.is_sufficient);
        assert_eq!(verdict.confidence, 0.9);
    }
}
