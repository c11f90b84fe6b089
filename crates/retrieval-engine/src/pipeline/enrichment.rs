use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use retrieval_types::{ChatMessage, EnrichedChatMessage};
use tracing::warn;

use crate::adapters::ChatPlatformClient;

const DEFAULT_WINDOW_SIDE_CAP: usize = 5;

/// Resolves thread replies and a temporal window for one hit. Any single
/// failure degrades that piece (thread or window omitted) rather than
/// failing the whole message.
pub async fn enrich(
    client: &Arc<dyn ChatPlatformClient>,
    hit: ChatMessage,
    window_minutes: i64,
) -> EnrichedChatMessage {
    let thread_replies = match &hit.thread_root_ts {
        Some(root) if root != &hit.ts => client
            .conversation_replies(&hit.channel_id, root)
            .await
            .unwrap_or_else(|e| {
                warn!(channel = %hit.channel_id, error = %e, "thread reply fetch failed, continuing without it");
                Vec::new()
            }),
        _ => Vec::new(),
    };

    let (window_before, window_after) = match ts_window(&hit.ts, window_minutes) {
        Some((oldest, latest)) => {
            let history = client
                .conversation_history(&hit.channel_id, &oldest, &latest, false, DEFAULT_WINDOW_SIDE_CAP * 2)
                .await
                .unwrap_or_else(|e| {
                    warn!(channel = %hit.channel_id, error = %e, "window fetch failed, continuing without it");
                    Vec::new()
                });
            split_window(history, &hit.ts)
        }
        None => (Vec::new(), Vec::new()),
    };

    let permalink = match &hit.permalink {
        Some(link) => Some(link.clone()),
        None => client
            .permalink(&hit.channel_id, &hit.ts)
            .await
            .ok()
            .flatten(),
    };

    let mut hit = hit;
    hit.permalink = permalink;

    EnrichedChatMessage {
        message: hit,
        thread_replies,
        window_before,
        window_after,
    }
}

fn ts_window(ts: &str, window_minutes: i64) -> Option<(String, String)> {
    let seconds: f64 = ts.parse().ok()?;
    let dt = Utc.timestamp_opt(seconds as i64, 0).single()?;
    let delta = chrono::Duration::minutes(window_minutes);
    Some((
        (dt - delta).timestamp().to_string(),
        (dt + delta).timestamp().to_string(),
    ))
}

fn split_window(mut history: Vec<ChatMessage>, hit_ts: &str) -> (Vec<ChatMessage>, Vec<ChatMessage>) {
    history.retain(|m| m.ts != hit_ts);
    history.sort_by(|a, b| a.ts.partial_cmp(&b.ts).unwrap_or(std::cmp::Ordering::Equal));

    let hit_seconds: f64 = hit_ts.parse().unwrap_or(0.0);
    let mut before = Vec::new();
    let mut after = Vec::new();
    for m in history {
        let s: f64 = m.ts.parse().unwrap_or(0.0);
        if s < hit_seconds {
            before.push(m);
        } else {
            after.push(m);
        }
    }
    if before.len() > DEFAULT_WINDOW_SIDE_CAP {
        before = before.split_off(before.len() - DEFAULT_WINDOW_SIDE_CAP);
    }
    after.truncate(DEFAULT_WINDOW_SIDE_CAP);
    (before, after)
}

/// Dedupe a batch of enriched messages by identity, keeping first
/// occurrence order.
pub fn dedupe(messages: Vec<EnrichedChatMessage>) -> Vec<EnrichedChatMessage> {
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    messages
        .into_iter()
        .filter(|m| seen.insert((m.message.channel_id.clone(), m.message.ts.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(channel: &str, ts: &str) -> ChatMessage {
        ChatMessage {
            channel_id: channel.to_string(),
            ts: ts.to_string(),
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            text: "hello".to_string(),
            thread_root_ts: None,
            permalink: None,
        }
    }

    fn enriched(channel: &str, ts: &str) -> EnrichedChatMessage {
        EnrichedChatMessage {
            message: msg(channel, ts),
            thread_replies: Vec::new(),
            window_before: Vec::new(),
            window_after: Vec::new(),
        }
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let messages = vec![enriched("c1", "100.0"), enriched("c1", "100.0"), enriched("c1", "200.0")];
        let deduped = dedupe(messages);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn window_split_separates_before_and_after() {
        let history = vec![msg("c1", "90.0"), msg("c1", "110.0"), msg("c1", "100.0")];
        let (before, after) = split_window(history, "100.0");
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 1);
    }
}
