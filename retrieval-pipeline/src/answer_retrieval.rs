use std::sync::Arc;

use common::{error::AppError, index::ScoredChunk, utils::embedding::EmbeddingProvider};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    completion::CompletionProvider,
    conversation::{format_history, ConversationLog, ConversationTurn},
    session::{SessionCache, SessionKey},
};

/// Number of chunks retrieved as completion context.
pub const RETRIEVAL_TOP_K: usize = 4;

/// Length of the evidence previews returned alongside the answer.
pub const SOURCE_PREVIEW_CHARS: usize = 100;

/// Answer strictly from the supplied context, in CommonMark that renders
/// cleanly in a constrained message-box UI.
pub const ANSWER_SYSTEM_PROMPT: &str = "Answer the user question based on the following context. \
Return the output in **CommonMark** that can be **cleanly rendered in a Markdown compiler** on \
the front end. The answer should fit in a message box, make line breaks accordingly. Use only \
the provided context.";

#[derive(Debug)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Convert retrieval results to JSON for the completion context.
pub fn chunks_to_chat_context(chunks: &[ScoredChunk]) -> Value {
    fn round_score(value: f32) -> f64 {
        (f64::from(value) * 1000.0).round() / 1000.0
    }

    serde_json::json!(chunks
        .iter()
        .map(|scored| {
            serde_json::json!({
                "id": scored.chunk.id,
                "content": scored.chunk.text,
                "score": round_score(scored.score),
            })
        })
        .collect::<Vec<_>>())
}

pub fn create_user_message_with_history(
    context_json: &Value,
    history: &[ConversationTurn],
    query: &str,
) -> String {
    format!(
        r"
        Chat history:
        ==================
        {}

        Context Information:
        ==================
        {}

        User Question:
        ==================
        {}
        ",
        format_history(history),
        context_json,
        query
    )
}

/// First `SOURCE_PREVIEW_CHARS` characters plus an ellipsis marker,
/// char-boundary safe.
fn source_preview(text: &str) -> String {
    let preview: String = text.chars().take(SOURCE_PREVIEW_CHARS).collect();
    format!("{preview}...")
}

/// Answers questions against one or more documents: resolve the session
/// index, retrieve the top matching chunks, complete, and record the turn.
pub struct AnsweringPipeline {
    sessions: SessionCache,
    conversations: ConversationLog,
    embeddings: Arc<EmbeddingProvider>,
    completions: Arc<CompletionProvider>,
}

impl AnsweringPipeline {
    pub fn new(
        sessions: SessionCache,
        embeddings: Arc<EmbeddingProvider>,
        completions: Arc<CompletionProvider>,
    ) -> Self {
        Self {
            sessions,
            conversations: ConversationLog::new(),
            embeddings,
            completions,
        }
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    #[instrument(skip_all, fields(document_count = document_ids.len()))]
    pub async fn answer(
        &self,
        document_ids: &[String],
        question: &str,
    ) -> Result<QueryAnswer, AppError> {
        let key = SessionKey::new(document_ids.iter().cloned());
        let index = self.sessions.resolve(&key).await?;
        let history = self.conversations.history(&key).await;

        let query_embedding = self.embeddings.embed(question).await?;
        let retrieved = index.search(&query_embedding, RETRIEVAL_TOP_K);
        debug!(
            session_key = %key,
            retrieved = retrieved.len(),
            history_turns = history.len(),
            "retrieved context for completion"
        );

        let context_json = chunks_to_chat_context(&retrieved);
        let user_message = create_user_message_with_history(&context_json, &history, question);
        let answer = self
            .completions
            .complete(ANSWER_SYSTEM_PROMPT, &user_message)
            .await?;

        self.conversations
            .append(&key, question.to_string(), answer.clone())
            .await;

        let sources = retrieved
            .iter()
            .map(|scored| source_preview(&scored.chunk.text))
            .collect();

        Ok(QueryAnswer { answer, sources })
    }

    /// Prior turns for a given id set; exposed for tests and diagnostics.
    pub async fn history(&self, document_ids: &[String]) -> Vec<ConversationTurn> {
        let key = SessionKey::new(document_ids.iter().cloned());
        self.conversations.history(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::index::document_store::DocumentStore;
    use common::index::{Chunk, VectorIndex};
    use common::storage::store::StorageManager;

    async fn pipeline_with_documents(docs: &[(&str, &[&str])]) -> AnsweringPipeline {
        let provider = Arc::new(EmbeddingProvider::new_hashed(256));
        let store = Arc::new(DocumentStore::new(StorageManager::memory()));
        for (id, texts) in docs {
            let embeddings = provider
                .embed_batch(texts.iter().map(|t| (*t).to_string()).collect())
                .await
                .expect("embedding should succeed");
            let chunks = texts
                .iter()
                .zip(embeddings)
                .map(|(text, embedding)| Chunk::new((*text).to_string(), embedding))
                .collect();
            store
                .attach(id, VectorIndex::from_chunks(chunks))
                .await
                .expect("attach");
        }

        AnsweringPipeline::new(
            SessionCache::new(store),
            provider,
            Arc::new(CompletionProvider::new_echo()),
        )
    }

    #[tokio::test]
    async fn answer_uses_the_matching_document_context() {
        let pipeline = pipeline_with_documents(&[
            ("doc-a", &["Paris is the capital of France"]),
            ("doc-b", &["Tokyo is the capital of Japan"]),
        ])
        .await;

        let result = pipeline
            .answer(
                &["doc-a".to_string()],
                "What is the capital of France?",
            )
            .await
            .expect("answer");

        assert!(result.answer.contains("Paris"));
        assert_eq!(result.sources.len(), 1);
        assert!(result.sources[0].starts_with("Paris is the capital of France"));
        assert!(result.sources[0].ends_with("..."));
    }

    #[tokio::test]
    async fn multi_document_answer_sees_both_documents() {
        let pipeline = pipeline_with_documents(&[
            ("doc-a", &["Paris is the capital of France"]),
            ("doc-b", &["Tokyo is the capital of Japan"]),
        ])
        .await;

        let result = pipeline
            .answer(
                &["doc-b".to_string(), "doc-a".to_string()],
                "What is the capital of France?",
            )
            .await
            .expect("answer");

        assert_eq!(result.sources.len(), 2);
        assert!(result.answer.contains("Paris"));
    }

    #[tokio::test]
    async fn reversed_id_order_shares_the_cached_session() {
        let pipeline = pipeline_with_documents(&[
            ("doc-a", &["Paris is the capital of France"]),
            ("doc-b", &["Tokyo is the capital of Japan"]),
        ])
        .await;

        let forward = pipeline
            .sessions()
            .resolve(&SessionKey::new(["doc-a", "doc-b"]))
            .await
            .expect("resolve");
        let reversed = pipeline
            .sessions()
            .resolve(&SessionKey::new(["doc-b", "doc-a"]))
            .await
            .expect("resolve");

        assert!(Arc::ptr_eq(&forward, &reversed));
    }

    #[tokio::test]
    async fn second_query_sees_exactly_the_first_turn() {
        let pipeline =
            pipeline_with_documents(&[("doc-a", &["Paris is the capital of France"])]).await;
        let ids = vec!["doc-a".to_string()];

        let first = pipeline
            .answer(&ids, "What is the capital of France?")
            .await
            .expect("first answer");

        let history = pipeline.history(&ids).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "What is the capital of France?");
        assert_eq!(history[0].answer, first.answer);

        let second_message = pipeline
            .answer(&ids, "Say it again?")
            .await
            .expect("second answer");
        // The echo backend returns the composed prompt, which must carry the
        // prior turn.
        assert!(second_message
            .answer
            .contains("What is the capital of France?"));

        assert_eq!(pipeline.history(&ids).await.len(), 2);
    }

    #[tokio::test]
    async fn answer_against_unknown_document_is_not_found() {
        let pipeline = pipeline_with_documents(&[]).await;

        let result = pipeline
            .answer(&["ghost".to_string()], "anything?")
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn sources_are_truncated_previews() {
        let long_text = "x".repeat(500);
        let pipeline = pipeline_with_documents(&[("doc", &[long_text.as_str()])]).await;

        let result = pipeline
            .answer(&["doc".to_string()], "x")
            .await
            .expect("answer");

        assert_eq!(result.sources[0].chars().count(), SOURCE_PREVIEW_CHARS + 3);
    }

    #[test]
    fn chunk_context_serializes_rounded_scores() {
        let chunk = Chunk::new("content".into(), vec![1.0, 0.0]);
        let scored = vec![ScoredChunk {
            chunk,
            score: 0.123_456,
        }];

        let json = chunks_to_chat_context(&scored);

        assert_eq!(json[0]["content"], "content");
        assert_eq!(json[0]["score"], 0.123);
    }
}
