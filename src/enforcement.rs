// Enforcement — acting on a verdict in the chat.
//
// The chat platform is reached only through ChatGateway, so the whole
// delete/notify/alert flow runs in tests against a fake gateway.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use crate::moderation::{AnalysisResult, Degradation, Moderator, ViolationKind};
use crate::output::truncate_chars;

/// The chat operations enforcement needs.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()>;
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// An inbound chat message, stripped down to what moderation looks at.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub sender_id: Option<u64>,
    pub text: Option<String>,
}

/// What enforcement did with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No text to moderate.
    Ignored,
    /// Evaluated and left alone.
    Clean,
    /// Deleted and announced.
    Removed {
        violations: Vec<ViolationKind>,
        toxicity: f64,
    },
    /// Should have been removed, but the chat operation failed.
    EnforcementFailed,
}

/// The notice posted in place of a removed message.
pub fn removal_notice(result: &AnalysisResult) -> String {
    format!(
        "⚠️ Message removed. Violations: {}\nToxicity score: {:.2}",
        result.violation_list(),
        result.toxicity()
    )
}

/// The alert sent to the administrator when moderation or enforcement fails.
pub fn admin_alert(error: &anyhow::Error) -> String {
    format!("🚨 Moderation failed for message: {error:#}")
}

/// Moderate one message: evaluate it, and on a violation delete it and post
/// the removal notice.
///
/// Never fails. Chat errors and engine failures are logged and, if
/// `admin_chat_id` is set, forwarded to the administrator.
pub async fn handle_message(
    moderator: &Moderator,
    gateway: &dyn ChatGateway,
    admin_chat_id: Option<i64>,
    message: &IncomingMessage,
) -> Outcome {
    let Some(text) = message.text.as_deref() else {
        return Outcome::Ignored;
    };

    let evaluation = moderator.evaluate(text).await;
    if let Some(degradation) = &evaluation.degradation {
        degradation.log();
        if matches!(degradation, Degradation::Engine(_)) {
            alert_admin(gateway, admin_chat_id, &anyhow::Error::new(degradation.clone())).await;
        }
    }

    let result = evaluation.result;
    if !result.is_violation() {
        return Outcome::Clean;
    }

    match remove(gateway, message, &result).await {
        Ok(()) => {
            info!(
                chat_id = message.chat_id,
                sender_id = ?message.sender_id,
                violations = %result.violation_list(),
                toxicity = result.toxicity(),
                preview = %truncate_chars(text, 50),
                "Deleted message"
            );
            Outcome::Removed {
                violations: result.violations().to_vec(),
                toxicity: result.toxicity(),
            }
        }
        Err(e) => {
            error!(
                chat_id = message.chat_id,
                message_id = message.message_id,
                error = %format!("{e:#}"),
                "Moderation error"
            );
            alert_admin(gateway, admin_chat_id, &e).await;
            Outcome::EnforcementFailed
        }
    }
}

async fn remove(
    gateway: &dyn ChatGateway,
    message: &IncomingMessage,
    result: &AnalysisResult,
) -> Result<()> {
    gateway
        .delete_message(message.chat_id, message.message_id)
        .await?;
    gateway
        .send_message(message.chat_id, &removal_notice(result))
        .await?;
    Ok(())
}

async fn alert_admin(
    gateway: &dyn ChatGateway,
    admin_chat_id: Option<i64>,
    failure: &anyhow::Error,
) {
    let Some(admin) = admin_chat_id else {
        return;
    };
    if let Err(e) = gateway.send_message(admin, &admin_alert(failure)).await {
        error!(admin_chat_id = admin, error = %format!("{e:#}"), "Failed to alert admin");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_two_decimals() {
        let result = AnalysisResult::from_signals(0.923, false, 0.85);
        assert_eq!(
            removal_notice(&result),
            "⚠️ Message removed. Violations: toxicity\nToxicity score: 0.92"
        );
    }

    #[test]
    fn test_notice_lists_both_kinds_in_order() {
        let result = AnalysisResult::from_signals(0.9, true, 0.85);
        assert!(removal_notice(&result).contains("Violations: toxicity, spam\n"));
    }

    #[test]
    fn test_admin_alert_for_engine_failure() {
        let err = anyhow::Error::new(Degradation::Engine("scorer exploded".to_string()));
        assert_eq!(
            admin_alert(&err),
            "🚨 Moderation failed for message: evaluation aborted, treated as clean: scorer exploded"
        );
    }

    #[test]
    fn test_admin_alert_includes_context_chain() {
        let err =
            anyhow::anyhow!("Bad Request: message can't be deleted").context("delete failed");
        assert_eq!(
            admin_alert(&err),
            "🚨 Moderation failed for message: delete failed: Bad Request: message can't be deleted"
        );
    }
}
