use crate::ai::client::{AiClient, AzureOpenAi};
use crate::config::{AppConfig, StorageConfig};
use crate::storage::{MemoryStorage, Storage, StorageClient};
use crate::users::repo::UserRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// `None` when storage is disabled; repository calls then fail with 503.
    pub storage: Option<Arc<dyn StorageClient>>,
    pub ai: Option<Arc<dyn AiClient>>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let storage = match &config.storage {
            StorageConfig::S3(s3) => {
                tracing::info!(bucket = %s3.bucket, "using S3 storage");
                Some(Arc::new(Storage::new(s3).await?) as Arc<dyn StorageClient>)
            }
            StorageConfig::Memory => {
                tracing::warn!("using in-memory storage; data is lost on restart");
                Some(Arc::new(MemoryStorage::new()) as Arc<dyn StorageClient>)
            }
            StorageConfig::Disabled => None,
        };

        let ai = match &config.ai {
            Some(ai) => Some(Arc::new(AzureOpenAi::new(ai)?) as Arc<dyn AiClient>),
            None => None,
        };

        Ok(Self {
            config,
            storage,
            ai,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        storage: Option<Arc<dyn StorageClient>>,
        ai: Option<Arc<dyn AiClient>>,
    ) -> Self {
        Self {
            config,
            storage,
            ai,
        }
    }

    /// In-memory storage, test token keys, no AI service.
    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Some(Arc::new(MemoryStorage::new())),
            None,
        )
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.storage.clone(), self.config.users_prefix.clone())
    }
}
