use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use common::{
    error::AppError,
    utils::config::{AppConfig, CompletionBackendKind},
};

/// Low temperature keeps answers grounded in the retrieved context.
const COMPLETION_TEMPERATURE: f32 = 0.2;

/// Generates the final answer text. The `openai` backend calls the chat
/// completions API; the `echo` backend returns the composed user prompt and
/// exists for deterministic offline tests.
#[derive(Clone)]
pub struct CompletionProvider {
    inner: CompletionInner,
}

#[derive(Clone)]
enum CompletionInner {
    OpenAI {
        client: Arc<Client<OpenAIConfig>>,
        model: String,
    },
    Echo,
}

impl CompletionProvider {
    pub fn from_config(config: &AppConfig, openai_client: Arc<Client<OpenAIConfig>>) -> Self {
        match config.completion_backend {
            CompletionBackendKind::OpenAI => {
                Self::new_openai(openai_client, config.query_model.clone())
            }
            CompletionBackendKind::Echo => Self::new_echo(),
        }
    }

    pub fn new_openai(client: Arc<Client<OpenAIConfig>>, model: String) -> Self {
        Self {
            inner: CompletionInner::OpenAI { client, model },
        }
    }

    pub fn new_echo() -> Self {
        Self {
            inner: CompletionInner::Echo,
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            CompletionInner::OpenAI { .. } => "openai",
            CompletionInner::Echo => "echo",
        }
    }

    /// Runs one completion over a system instruction and a composed user
    /// message. Upstream failures and timeouts surface as `AppError::OpenAI`.
    pub async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> Result<String, AppError> {
        match &self.inner {
            CompletionInner::Echo => Ok(user_message.to_string()),
            CompletionInner::OpenAI { client, model } => {
                let request = CreateChatCompletionRequestArgs::default()
                    .model(model)
                    .temperature(COMPLETION_TEMPERATURE)
                    .messages([
                        ChatCompletionRequestSystemMessage::from(system_message).into(),
                        ChatCompletionRequestUserMessage::from(user_message).into(),
                    ])
                    .build()?;

                let response = client.chat().create(request).await?;

                response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .ok_or_else(|| {
                        AppError::Validation("No content found in completion response".into())
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_backend_returns_the_user_message() {
        let provider = CompletionProvider::new_echo();

        let answer = provider
            .complete("system instruction", "user prompt with context")
            .await
            .expect("echo completion");

        assert_eq!(answer, "user prompt with context");
    }
}
