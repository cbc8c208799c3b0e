use std::sync::Arc;

use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{debug, error};

use crate::error::{AppError, AppResult};
use crate::storage::StorageClient;
use crate::users::repo_types::{UserRecord, UserState, Username};

/// Load/save/delete of per-user documents in object storage.
///
/// `save` is a read-modify-write without compare-and-swap: last writer wins.
/// Each user has one authenticated writer, but two tabs of the same user can
/// still overwrite each other.
#[derive(Clone)]
pub struct UserRepository {
    storage: Option<Arc<dyn StorageClient>>,
    prefix: String,
}

impl UserRepository {
    pub fn new(storage: Option<Arc<dyn StorageClient>>, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    fn storage(&self) -> AppResult<&dyn StorageClient> {
        self.storage
            .as_deref()
            .ok_or_else(|| AppError::StorageUnavailable("Storage not configured".into()))
    }

    pub fn key_for(&self, username: &Username) -> String {
        format!("{}{}.json", self.prefix, username)
    }

    pub async fn exists(&self, username: &Username) -> AppResult<bool> {
        self.storage()?
            .object_exists(&self.key_for(username))
            .await
            .map_err(unavailable("exists"))
    }

    /// Reads the raw record, credential included.
    pub async fn find(&self, username: &Username) -> AppResult<Option<UserRecord>> {
        let key = self.key_for(username);
        let Some(body) = self
            .storage()?
            .get_object(&key)
            .await
            .map_err(unavailable("read"))?
        else {
            return Ok(None);
        };
        if body.is_empty() {
            return Ok(Some(UserRecord::default()));
        }
        let record = serde_json::from_slice::<UserRecord>(&body).map_err(|e| {
            error!(error = %e, %key, "corrupt user document");
            AppError::Internal(format!("corrupt user document {key}"))
        })?;
        Ok(Some(record))
    }

    pub async fn load(&self, username: &Username) -> AppResult<UserRecord> {
        self.find(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// Replaces the user's state with `state`. The existing credential is kept
    /// unless `new_password_hash` is given.
    pub async fn save(
        &self,
        username: &Username,
        state: &UserState,
        new_password_hash: Option<&str>,
    ) -> AppResult<UserRecord> {
        let existing = self.find(username).await?;
        let password_hash = new_password_hash
            .map(str::to_string)
            .or_else(|| existing.and_then(|r| r.password_hash));

        let record = UserRecord {
            password_hash,
            birth_year: state.birth_year,
            filled_weeks: state.filled_weeks.clone(),
            journal: state.journal.clone(),
            updated_at: Some(OffsetDateTime::now_utc()),
        };
        let body = serde_json::to_vec_pretty(&record)
            .map_err(|e| AppError::Internal(format!("serialize user document: {e}")))?;

        self.storage()?
            .put_object(&self.key_for(username), Bytes::from(body), "application/json")
            .await
            .map_err(unavailable("write"))?;
        debug!(%username, weeks = record.filled_weeks.len(), "user document saved");
        Ok(record)
    }

    /// Idempotent: removing an unknown user succeeds.
    pub async fn delete(&self, username: &Username) -> AppResult<()> {
        self.storage()?
            .delete_object(&self.key_for(username))
            .await
            .map_err(unavailable("delete"))
    }

    pub async fn list_all(&self) -> AppResult<Vec<String>> {
        let keys = self
            .storage()?
            .list_keys(&self.prefix)
            .await
            .map_err(unavailable("list"))?;
        let mut users: Vec<String> = keys
            .iter()
            .filter_map(|k| k.strip_prefix(&self.prefix))
            .map(|name| name.strip_suffix(".json").unwrap_or(name))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        users.sort();
        Ok(users)
    }
}

fn unavailable(op: &'static str) -> impl Fn(anyhow::Error) -> AppError {
    move |e| {
        error!(error = %format!("{e:#}"), op, "storage operation failed");
        AppError::StorageUnavailable(format!("storage {op} failed"))
    }
}
