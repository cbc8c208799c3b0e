use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Where user documents live.
#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    S3(S3Config),
    Memory,
    /// No backing store: every repository call fails with 503.
    Disabled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub token: TokenConfig,
    pub storage: StorageConfig,
    pub users_prefix: String,
    pub ai: Option<AiConfig>,
    pub cors_allow_origin: Option<String>,
}

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let token = TokenConfig {
            secret: std::env::var("TOKEN_SECRET").context("TOKEN_SECRET must be set")?,
            issuer: std::env::var("TOKEN_ISSUER").unwrap_or_else(|_| "lifegrass".into()),
            audience: std::env::var("TOKEN_AUDIENCE").unwrap_or_else(|_| "lifegrass-users".into()),
            ttl_minutes: std::env::var("TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES),
        };

        let storage = storage_from_env()?;

        let ai = match (std::env::var("AI_API_KEY"), std::env::var("AI_ENDPOINT")) {
            (Ok(api_key), Ok(endpoint)) if !api_key.is_empty() && !endpoint.is_empty() => {
                Some(AiConfig {
                    api_key,
                    endpoint,
                    model: std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-5-mini".into()),
                    timeout_secs: std::env::var("AI_TIMEOUT_SECS")
                        .ok()
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(30),
                })
            }
            _ => {
                tracing::warn!("AI_API_KEY or AI_ENDPOINT missing; AI endpoints will answer 503");
                None
            }
        };

        Ok(Self {
            token,
            storage,
            users_prefix: std::env::var("USERS_PREFIX").unwrap_or_else(|_| "users/".into()),
            ai,
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok().filter(|v| !v.is_empty()),
        })
    }

    /// Configuration for tests and local experiments: in-memory storage, no AI.
    pub fn for_tests() -> Self {
        Self {
            token: TokenConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            },
            storage: StorageConfig::Memory,
            users_prefix: "users/".into(),
            ai: None,
            cors_allow_origin: None,
        }
    }
}

fn storage_from_env() -> anyhow::Result<StorageConfig> {
    let bucket = std::env::var("S3_BUCKET").ok().filter(|v| !v.is_empty());
    let backend = std::env::var("STORAGE_BACKEND")
        .unwrap_or_else(|_| if bucket.is_some() { "s3".into() } else { "disabled".into() });

    match backend.as_str() {
        "s3" => Ok(StorageConfig::S3(S3Config {
            endpoint: std::env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
            bucket: bucket.context("S3_BUCKET must be set for the s3 backend")?,
            access_key: std::env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY must be set")?,
            secret_key: std::env::var("S3_SECRET_KEY").context("S3_SECRET_KEY must be set")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
        })),
        "memory" => Ok(StorageConfig::Memory),
        "disabled" => {
            tracing::warn!("no storage backend configured; user data endpoints will answer 503");
            Ok(StorageConfig::Disabled)
        }
        other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}"),
    }
}
