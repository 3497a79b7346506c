use std::sync::Arc;

use common::{
    index::document_store::DocumentStore,
    storage::{db::SurrealDbClient, store::StorageManager},
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use ingestion_pipeline::IngestionPipeline;
use retrieval_pipeline::{AnsweringPipeline, CompletionProvider, SessionCache};

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub ingestion: Arc<IngestionPipeline>,
    pub answering: Arc<AnsweringPipeline>,
}

impl ApiState {
    pub async fn new(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Arc::new(
            SurrealDbClient::new(
                &config.surrealdb_address,
                &config.surrealdb_username,
                &config.surrealdb_password,
                &config.surrealdb_namespace,
                &config.surrealdb_database,
            )
            .await?,
        );
        db.ensure_initialized().await?;

        let storage = StorageManager::new(config).await?;

        let openai_config = async_openai::config::OpenAIConfig::new()
            .with_api_key(config.openai_api_key.clone())
            .with_api_base(config.openai_base_url.clone());
        let openai_client = Arc::new(async_openai::Client::with_config(openai_config));

        let embeddings = Arc::new(EmbeddingProvider::from_config(
            config,
            Arc::clone(&openai_client),
        ));
        let completions = Arc::new(CompletionProvider::from_config(config, openai_client));

        let documents = Arc::new(DocumentStore::new(storage.clone()));
        let ingestion = Arc::new(IngestionPipeline::new(
            Arc::clone(&db),
            storage,
            Arc::clone(&documents),
            Arc::clone(&embeddings),
        ));
        let answering = Arc::new(AnsweringPipeline::new(
            SessionCache::new(documents),
            embeddings,
            completions,
        ));

        Ok(Self {
            db,
            config: config.clone(),
            ingestion,
            answering,
        })
    }
}
