//! Wire shape of inbound events delivered over the gateway socket.
//! Each event is either a direct mention or a DM.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Mention,
    DirectMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

impl InboundEvent {
    /// The thread a reply belongs in: the message's own thread root if
    /// it's already a reply, otherwise the triggering message itself.
    pub fn reply_thread_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }

    /// Strips a leading `<@bot_user_id>` mention (and any surrounding
    /// whitespace) from the message text, leaving the actual query.
    pub fn query_text(&self, bot_user_id: &str) -> String {
        let needle = format!("<@{bot_user_id}>");
        self.text.replacen(&needle, "", 1).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, text: &str, thread_ts: Option<&str>) -> InboundEvent {
        InboundEvent {
            kind,
            channel_id: "C1".to_string(),
            channel_name: "general".to_string(),
            user_id: "U1".to_string(),
            text: text.to_string(),
            ts: "100.001".to_string(),
            thread_ts: thread_ts.map(str::to_string),
        }
    }

    #[test]
    fn reply_thread_falls_back_to_own_ts_when_not_already_threaded() {
        let e = event(EventKind::Mention, "hi", None);
        assert_eq!(e.reply_thread_ts(), "100.001");
    }

    #[test]
    fn reply_thread_uses_existing_thread_root() {
        let e = event(EventKind::Mention, "hi", Some("99.000"));
        assert_eq!(e.reply_thread_ts(), "99.000");
    }

    #[test]
    fn query_text_strips_the_leading_mention() {
        let e = event(EventKind::Mention, "<@B1> what's our deploy process?", None);
        assert_eq!(e.query_text("B1"), "what's our deploy process?");
    }
}
