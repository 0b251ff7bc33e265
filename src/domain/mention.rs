//! Mention-based re-targeting of messages to public accounts.
//!
//! A message whose text payload contains `@identity` naming a known public
//! account is delivered to that account instead of the declared target.
//! Original-sender provenance is attached either way.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::message::{InboundMessage, OriginalSender};
use super::{Identity, PublicAccountSet};

/// Payload fields scanned for mention text, in priority order.
const TEXT_FIELDS: [&str; 4] = ["message", "text", "content", "body"];

/// `@name` tokens: `@` followed by one or more word characters.
static MENTION_RE: LazyLock<Regex> = LazyLock::new(compile_mention_pattern);

#[allow(clippy::expect_used)]
fn compile_mention_pattern() -> Regex {
    Regex::new(r"@([A-Za-z0-9_]+)").expect("mention pattern is valid")
}

/// Resolution result: the delivery target plus the provenance block.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// Identity the message should be delivered to.
    pub target: Identity,
    /// Original-sender block to attach to the wire message.
    pub original_sender: OriginalSender,
}

/// Resolves the delivery target of a message from `@` mentions.
#[derive(Debug, Clone)]
pub struct MentionRouter {
    accounts: Arc<PublicAccountSet>,
}

impl MentionRouter {
    /// Creates a router over the given public account set.
    #[must_use]
    pub fn new(accounts: Arc<PublicAccountSet>) -> Self {
        Self { accounts }
    }

    /// Determines where a message should be delivered.
    ///
    /// Scans the first string value among the conventional text fields for
    /// `@name` tokens in left-to-right order; the first token naming a known
    /// public account wins. Without a match the declared sender identity is
    /// the target. The original sender is preserved in both cases.
    pub async fn resolve_target(&self, message: &InboundMessage) -> ResolvedTarget {
        let original_sender = OriginalSender {
            identity: message.identity.clone(),
            timestamp: message.timestamp,
        };

        let target = match self.first_mentioned_account(message).await {
            Some(account) => {
                tracing::debug!(
                    sender = %message.identity,
                    target = %account,
                    "message redirected to mentioned public account"
                );
                Identity::from(account)
            }
            None => message.identity.clone(),
        };

        ResolvedTarget {
            target,
            original_sender,
        }
    }

    async fn first_mentioned_account(&self, message: &InboundMessage) -> Option<String> {
        let text = TEXT_FIELDS
            .iter()
            .find_map(|field| message.data.get(field).and_then(serde_json::Value::as_str))?;

        for capture in MENTION_RE.captures_iter(text) {
            let Some(name) = capture.get(1) else {
                continue;
            };
            if self.accounts.contains(name.as_str()).await {
                return Some(name.as_str().to_string());
            }
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn router_with(accounts: &[&str]) -> MentionRouter {
        MentionRouter::new(Arc::new(PublicAccountSet::with_accounts(
            accounts.iter().copied(),
        )))
    }

    fn msg(sender: &str, data: serde_json::Value) -> InboundMessage {
        InboundMessage {
            identity: Identity::from(sender),
            data,
            event_type: None,
            event_id: None,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn known_mention_redirects_target() {
        let router = router_with(&["ci_bot"]);
        let m = msg("user123", json!({"message": "run tests @ci_bot"}));

        let resolved = router.resolve_target(&m).await;
        assert_eq!(resolved.target, Identity::from("ci_bot"));
        assert_eq!(resolved.original_sender.identity, Identity::from("user123"));
    }

    #[tokio::test]
    async fn no_mention_keeps_sender_as_target() {
        let router = router_with(&["ci_bot"]);
        let m = msg("user123", json!({"message": "a normal message"}));

        let resolved = router.resolve_target(&m).await;
        assert_eq!(resolved.target, Identity::from("user123"));
        assert_eq!(resolved.original_sender.identity, Identity::from("user123"));
    }

    #[tokio::test]
    async fn unknown_mention_keeps_sender_as_target() {
        let router = router_with(&["ci_bot"]);
        let m = msg("user123", json!({"message": "hey @stranger"}));

        let resolved = router.resolve_target(&m).await;
        assert_eq!(resolved.target, Identity::from("user123"));
    }

    #[tokio::test]
    async fn first_known_account_wins_left_to_right() {
        let router = router_with(&["ci_bot", "notification_bot"]);
        let m = msg(
            "user123",
            json!({"message": "ping @notification_bot and @ci_bot"}),
        );

        let resolved = router.resolve_target(&m).await;
        assert_eq!(resolved.target, Identity::from("notification_bot"));
    }

    #[tokio::test]
    async fn unknown_mentions_are_skipped_for_later_known_ones() {
        let router = router_with(&["ci_bot"]);
        let m = msg("user123", json!({"message": "cc @alice @ci_bot"}));

        let resolved = router.resolve_target(&m).await;
        assert_eq!(resolved.target, Identity::from("ci_bot"));
    }

    #[tokio::test]
    async fn field_priority_message_over_text() {
        let router = router_with(&["ci_bot", "notification_bot"]);
        let m = msg(
            "user123",
            json!({"text": "@ci_bot", "message": "@notification_bot"}),
        );

        let resolved = router.resolve_target(&m).await;
        assert_eq!(resolved.target, Identity::from("notification_bot"));
    }

    #[tokio::test]
    async fn scan_skips_non_string_fields() {
        let router = router_with(&["ci_bot"]);
        // `message` is present but not a string; the first string value
        // found in priority order is `body`.
        let m = msg("user123", json!({"message": 42, "body": "@ci_bot"}));

        let resolved = router.resolve_target(&m).await;
        assert_eq!(resolved.target, Identity::from("ci_bot"));
    }

    #[tokio::test]
    async fn mention_followed_by_punctuation_matches() {
        let router = router_with(&["ci_bot"]);
        let m = msg("user123", json!({"message": "thanks, @ci_bot!"}));

        let resolved = router.resolve_target(&m).await;
        assert_eq!(resolved.target, Identity::from("ci_bot"));
    }

    #[tokio::test]
    async fn timestamp_flows_into_original_sender() {
        let router = router_with(&[]);
        let mut m = msg("user123", json!({"message": "hi"}));
        let now = chrono::Utc::now();
        m.timestamp = Some(now);

        let resolved = router.resolve_target(&m).await;
        assert_eq!(resolved.original_sender.timestamp, Some(now));
    }
}
