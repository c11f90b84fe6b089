use std::sync::Arc;
use std::time::Instant;

use retrieval_types::{ChatRetrievalResult, ProgressEvent};

use crate::adapters::ChatPlatformClient;
use crate::progress_stream::ProgressStream;

use super::enrichment::{dedupe, enrich};
use super::planner::LlmQueryPlanner;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_iterations: usize,
    pub queries_per_iteration: usize,
    pub context_window_minutes: i64,
    pub max_context_messages: usize,
    pub messages_per_query: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            queries_per_iteration: 3,
            context_window_minutes: 30,
            max_context_messages: 10,
            messages_per_query: 10,
        }
    }
}

/// The INIT -> PLAN -> SEARCH -> ENRICH -> CHECK -> {DONE|REPLAN} state
/// machine. Runs at most `config.max_iterations` rounds, feeding the
/// previous round's missing-info back into the next planning call.
pub struct SlackRetrievalPipeline {
    planner: LlmQueryPlanner,
    chat_platform: Arc<dyn ChatPlatformClient>,
    config: PipelineConfig,
}

impl SlackRetrievalPipeline {
    pub fn new(planner: LlmQueryPlanner, chat_platform: Arc<dyn ChatPlatformClient>, config: PipelineConfig) -> Self {
        Self { planner, chat_platform, config }
    }

    pub async fn run(
        &self,
        question: &str,
        channels: &[String],
        progress: Option<&ProgressStream>,
    ) -> Result<ChatRetrievalResult, retrieval_types::RetrievalError> {
        let started = Instant::now();
        let mut queries_used = Vec::new();
        let mut enriched_all = Vec::new();
        let mut missing_info: Vec<String> = Vec::new();
        let mut iteration = 0usize;
        let mut is_sufficient = false;
        let mut confidence = 0.0f32;
        let mut iterations: Vec<retrieval_types::IterationRecord> = Vec::new();

        while iteration < self.config.max_iterations {
            let iteration_started = Instant::now();
            iteration += 1;
            if let Some(stream) = progress {
                stream.publish(ProgressEvent::IterationStarted {
                    index: iteration,
                    max: self.config.max_iterations,
                });
            }

            let planned = if iteration == 1 {
                match self.planner.plan(question, self.config.queries_per_iteration).await {
                    Ok(q) if !q.is_empty() => q,
                    Ok(_) => return Err(retrieval_types::RetrievalError::PlanningFailed(
                        "planner returned no queries".to_string(),
                    )),
                    Err(e) => return Err(retrieval_types::RetrievalError::PlanningFailed(e.to_string())),
                }
            } else {
                match self
                    .planner
                    .replan(question, self.config.queries_per_iteration, &missing_info)
                    .await
                {
                    Ok(q) if !q.is_empty() => q,
                    _ => break, // no improvement on a later iteration; stop trying
                }
            };

            queries_used.extend(planned.iter().cloned());

            let mut round_hits = Vec::new();
            for q in &planned {
                match self
                    .chat_platform
                    .search_messages(q, channels, self.config.messages_per_query)
                    .await
                {
                    Ok(response) => round_hits.extend(response.messages),
                    Err(_) => continue,
                }
            }

            let mut round_enriched = Vec::new();
            for hit in round_hits {
                round_enriched.push(enrich(&self.chat_platform, hit, self.config.context_window_minutes).await);
            }

            enriched_all.extend(round_enriched);
            enriched_all = dedupe(enriched_all);
            if enriched_all.len() > self.config.max_context_messages {
                enriched_all.truncate(self.config.max_context_messages);
            }

            let matches_this_round = enriched_all.len();

            if iteration >= self.config.max_iterations {
                is_sufficient = true;
                missing_info = vec!["cap reached".to_string()];
                confidence = 0.3;
                if let Some(stream) = progress {
                    stream.publish(ProgressEvent::IterationFinished {
                        index: iteration,
                        max: self.config.max_iterations,
                        matches: matches_this_round,
                    });
                }
                iterations.push(retrieval_types::IterationRecord {
                    index: iteration,
                    queries_tried: planned,
                    matches_returned: matches_this_round,
                    is_sufficient,
                    missing_info: missing_info.clone(),
                    confidence,
                    elapsed: iteration_started.elapsed(),
                });
                break;
            }

            let context = render_context(&enriched_all);
            let verdict = match self.planner.check_sufficiency(question, &context).await {
                Ok(v) => v,
                Err(_) => super::planner::SufficiencyVerdict {
                    is_sufficient: false,
                    missing_info: vec!["evaluation failed".to_string()],
                    reasoning: String::new(),
                    confidence: 0.0,
                },
            };

            if let Some(stream) = progress {
                stream.publish(ProgressEvent::IterationFinished {
                    index: iteration,
                    max: self.config.max_iterations,
                    matches: matches_this_round,
                });
            }

            is_sufficient = verdict.is_sufficient;
            missing_info = verdict.missing_info;
            confidence = verdict.confidence;
            iterations.push(retrieval_types::IterationRecord {
                index: iteration,
                queries_tried: planned,
                matches_returned: matches_this_round,
                is_sufficient,
                missing_info: missing_info.clone(),
                confidence,
                elapsed: iteration_started.elapsed(),
            });
            if is_sufficient {
                break;
            }
        }

        let total_matches = enriched_all.len();
        let source_map = enriched_all
            .iter()
            .filter_map(|m| {
                m.message
                    .permalink
                    .clone()
                    .map(|link| (retrieval_types::source_key(&m.message.channel_id, &m.message.ts), link))
            })
            .collect();

        if let Some(stream) = progress {
            stream.publish(ProgressEvent::ChatSearchComplete {
                total: total_matches,
                is_sufficient,
            });
        }

        Ok(ChatRetrievalResult {
            enriched: enriched_all,
            queries_used,
            iteration_count: iteration,
            iterations,
            total_matches,
            is_sufficient,
            missing_info,
            confidence,
            elapsed: started.elapsed(),
            source_map,
        })
    }
}

fn render_context(enriched: &[retrieval_types::EnrichedChatMessage]) -> String {
    enriched
        .iter()
        .map(|m| {
            let mut block = format!(
                "[{}] {} ({}): {}",
                m.message.channel_id, m.message.username, m.message.ts, m.message.text
            );
            for reply in &m.thread_replies {
                block.push_str(&format!("\n  \u{2514} {}: {}", reply.username, reply.text));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
