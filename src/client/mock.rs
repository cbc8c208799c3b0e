//! In-memory stand-in for the HTTP API used by the client unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use axum::async_trait;

use super::api::LifeApi;
use super::error::{ClientError, ClientResult};
use crate::ai::dto::JournalTextRequest;
use crate::users::repo_types::{UserState, Username};

#[derive(Default)]
pub struct MockApi {
    users: Mutex<HashMap<String, (String, UserState)>>,
    pub offline: AtomicBool,
    pub ai_down: AtomicBool,
    ai_answer: Mutex<Option<String>>,
    push_delays_ms: Mutex<VecDeque<u64>>,
    pub pushes: Mutex<Vec<UserState>>,
    pub ai_calls: AtomicUsize,
    without_data: Mutex<HashSet<String>>,
    checks_left: Mutex<Option<usize>>,
}

fn http(status: u16, message: &str) -> ClientError {
    ClientError::Http {
        status,
        message: message.into(),
    }
}

pub fn token_for(username: &str) -> String {
    format!("tok-{username}")
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, password: &str, state: UserState) {
        self.users
            .lock()
            .unwrap()
            .insert(username.into(), (password.into(), state));
    }

    pub fn server_state(&self, username: &str) -> Option<UserState> {
        self.users.lock().unwrap().get(username).map(|(_, s)| s.clone())
    }

    pub fn set_ai_answer(&self, answer: &str) {
        *self.ai_answer.lock().unwrap() = Some(answer.into());
    }

    /// Delay for each upcoming push, in call order.
    pub fn delay_pushes(&self, delays_ms: &[u64]) {
        self.push_delays_ms.lock().unwrap().extend(delays_ms);
    }

    /// Existence checks keep answering `true` but data calls return 404.
    pub fn drop_data(&self, username: &str) {
        self.without_data.lock().unwrap().insert(username.into());
    }

    /// Existence checks fail as unreachable once `n` have succeeded.
    pub fn fail_checks_after(&self, n: usize) {
        *self.checks_left.lock().unwrap() = Some(n);
    }

    fn online(&self) -> ClientResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::Network("connection refused".into()));
        }
        Ok(())
    }

    fn authorize(&self, username: &Username, token: &str) -> ClientResult<()> {
        if token != token_for(username.as_str()) {
            return Err(http(401, "Unauthorized"));
        }
        if !self.users.lock().unwrap().contains_key(username.as_str())
            || self.without_data.lock().unwrap().contains(username.as_str())
        {
            return Err(http(404, "User not found"));
        }
        Ok(())
    }

    fn ai(&self) -> ClientResult<String> {
        self.online()?;
        self.ai_calls.fetch_add(1, Ordering::SeqCst);
        if self.ai_down.load(Ordering::SeqCst) {
            return Err(http(502, "AI request failed"));
        }
        Ok(self
            .ai_answer
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "A lovely week.".into()))
    }
}

#[async_trait]
impl LifeApi for MockApi {
    async fn check_exists(&self, username: &Username) -> ClientResult<bool> {
        self.online()?;
        if let Some(left) = self.checks_left.lock().unwrap().as_mut() {
            if *left == 0 {
                return Err(ClientError::Network("connection reset".into()));
            }
            *left -= 1;
        }
        Ok(self.users.lock().unwrap().contains_key(username.as_str()))
    }

    async fn register(
        &self,
        username: &Username,
        password: &str,
        birth_year: Option<i32>,
    ) -> ClientResult<String> {
        self.online()?;
        let mut users = self.users.lock().unwrap();
        if users.contains_key(username.as_str()) {
            return Err(http(409, "Username already taken"));
        }
        let state = UserState {
            birth_year,
            ..Default::default()
        };
        users.insert(username.to_string(), (password.into(), state));
        Ok(token_for(username.as_str()))
    }

    async fn login(&self, username: &Username, password: &str) -> ClientResult<String> {
        self.online()?;
        match self.users.lock().unwrap().get(username.as_str()) {
            Some((stored, _)) if stored == password => Ok(token_for(username.as_str())),
            _ => Err(http(401, "Invalid password")),
        }
    }

    async fn fetch_state(&self, username: &Username, token: &str) -> ClientResult<UserState> {
        self.online()?;
        self.authorize(username, token)?;
        self.server_state(username.as_str())
            .ok_or_else(|| http(404, "User not found"))
    }

    async fn push_state(
        &self,
        username: &Username,
        token: &str,
        state: &UserState,
    ) -> ClientResult<()> {
        let delay = self.push_delays_ms.lock().unwrap().pop_front();
        if let Some(ms) = delay {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        self.online()?;
        self.authorize(username, token)?;
        if let Some((_, stored)) = self.users.lock().unwrap().get_mut(username.as_str()) {
            *stored = state.clone();
        }
        self.pushes.lock().unwrap().push(state.clone());
        Ok(())
    }

    async fn comment(&self, _req: &JournalTextRequest) -> ClientResult<String> {
        self.ai()
    }

    async fn recommend(&self, _req: &JournalTextRequest) -> ClientResult<String> {
        self.ai()
    }
}
