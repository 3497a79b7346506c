use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::session::SessionKey;

/// One question/answer exchange, appended in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Per-session ordered history of turns. Process-scoped and unbounded; there
/// is no eviction.
#[derive(Default)]
pub struct ConversationLog {
    turns: Mutex<HashMap<SessionKey, Vec<ConversationTurn>>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn history(&self, key: &SessionKey) -> Vec<ConversationTurn> {
        self.turns
            .lock()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn append(&self, key: &SessionKey, question: String, answer: String) {
        self.turns
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .push(ConversationTurn { question, answer });
    }
}

/// Renders prior turns for the completion prompt.
pub fn format_history(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("User: {}\nAI: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn history_is_empty_for_unknown_session() {
        let log = ConversationLog::new();
        let key = SessionKey::new(["a"]);

        assert!(log.history(&key).await.is_empty());
    }

    #[tokio::test]
    async fn turns_accumulate_in_arrival_order() {
        let log = ConversationLog::new();
        let key = SessionKey::new(["a", "b"]);

        log.append(&key, "first?".into(), "one".into()).await;
        log.append(&key, "second?".into(), "two".into()).await;

        let history = log.history(&key).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "first?");
        assert_eq!(history[1].answer, "two");
    }

    #[tokio::test]
    async fn set_equal_keys_share_one_history() {
        let log = ConversationLog::new();

        log.append(&SessionKey::new(["b", "a"]), "q".into(), "a".into())
            .await;

        let history = log.history(&SessionKey::new(["a", "b", "a"])).await;
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn format_history_renders_roles() {
        let history = vec![
            ConversationTurn {
                question: "What is the capital of France?".into(),
                answer: "Paris.".into(),
            },
            ConversationTurn {
                question: "And of Japan?".into(),
                answer: "Tokyo.".into(),
            },
        ];

        let rendered = format_history(&history);
        assert_eq!(
            rendered,
            "User: What is the capital of France?\nAI: Paris.\nUser: And of Japan?\nAI: Tokyo."
        );
    }
}
