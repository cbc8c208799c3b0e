use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use super::cache::{KeyValueStore, LocalCache};
use super::error::{ClientError, ClientResult};
use crate::users::repo_types::Username;

/// Extracts the lowercased username from a page path like `/alice`.
pub fn username_from_path(path: &str) -> Option<String> {
    lazy_static! {
        static ref USER_PATH: Regex = Regex::new(r"^/([A-Za-z0-9_-]+)$").unwrap();
    }
    USER_PATH
        .captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Everything one page load knows about its user: who it is, the local cache
/// and the bearer token, if any. Built once and passed to the auth flow and
/// the sync orchestrator.
#[derive(Clone)]
pub struct Session {
    cache: LocalCache,
    token: Option<String>,
}

impl Session {
    pub fn new(username: Username, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            cache: LocalCache::new(store, username),
            token: None,
        }
    }

    /// Fails with `MissingUsername` when the path does not name a user; the
    /// caller sends the browser back to the landing page.
    pub fn from_path(path: &str, store: Arc<dyn KeyValueStore>) -> ClientResult<Self> {
        let raw = username_from_path(path).ok_or(ClientError::MissingUsername)?;
        let username = Username::parse(&raw).map_err(|_| ClientError::MissingUsername)?;
        Ok(Self::new(username, store))
    }

    pub fn username(&self) -> &Username {
        self.cache.username()
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Picks up a token persisted by an earlier page load.
    pub fn load_token(&mut self) -> ClientResult<Option<&str>> {
        self.token = self.cache.token()?;
        Ok(self.token.as_deref())
    }

    pub fn set_token(&mut self, token: String) -> ClientResult<()> {
        self.cache.set_token(&token)?;
        self.token = Some(token);
        Ok(())
    }

    pub fn clear_token(&mut self) -> ClientResult<()> {
        self.token = None;
        self.cache.clear_token()
    }

    /// Forgets the token and every cached field of this user.
    pub fn clear_all(&mut self) -> ClientResult<()> {
        self.token = None;
        self.cache.clear_all()
    }
}
