use std::sync::Arc;

use tracing::{debug, info, warn};

use super::api::LifeApi;
use super::error::{ClientError, ClientResult};
use super::session::Session;
use super::sync::SyncOrchestrator;
use crate::auth::services::MIN_PASSWORD_LEN;
use crate::users::repo_types::{MAX_BIRTH_YEAR, MIN_BIRTH_YEAR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    CheckingExistence,
    NeedsRegistration,
    NeedsLogin,
    Authenticated,
    Synced,
}

/// Gates a user's page: existence check, then token reuse, registration or
/// password login. Every branch asks the server again instead of trusting an
/// earlier answer, since an admin may delete the user at any point.
pub struct AuthFlow {
    api: Arc<dyn LifeApi>,
    session: Session,
    state: AuthState,
}

impl AuthFlow {
    pub fn new(api: Arc<dyn LifeApi>, session: Session) -> Self {
        Self {
            api,
            session,
            state: AuthState::CheckingExistence,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn start(&mut self) -> ClientResult<AuthState> {
        self.state = AuthState::CheckingExistence;
        let username = self.session.username().clone();

        match self.api.check_exists(&username).await {
            Ok(true) => {}
            Ok(false) => return self.new_user(),
            Err(e) => {
                // fail open toward registration, never toward the page itself
                warn!(%username, error = %e, "existence check failed; treating as new user");
                return self.new_user();
            }
        }

        if let Some(token) = self.session.load_token()?.map(str::to_string) {
            match self.api.fetch_state(&username, &token).await {
                Ok(_) => {
                    debug!(%username, "cached token accepted");
                    self.state = AuthState::Authenticated;
                    return Ok(self.state);
                }
                Err(e) if matches!(e.status(), Some(401) | Some(404)) => {
                    if e.status() == Some(404) {
                        info!(%username, "account disappeared; clearing local data");
                        self.session.clear_all()?;
                    } else {
                        self.session.clear_token()?;
                    }
                }
                Err(e) => {
                    warn!(%username, error = %e, "token check failed");
                    self.session.clear_token()?;
                }
            }
        }

        match self.api.check_exists(&username).await {
            Ok(true) => {
                self.state = AuthState::NeedsLogin;
                Ok(self.state)
            }
            Ok(false) => self.new_user(),
            Err(e) => {
                warn!(%username, error = %e, "existence re-check failed; treating as new user");
                self.new_user()
            }
        }
    }

    fn new_user(&mut self) -> ClientResult<AuthState> {
        self.session.clear_all()?;
        self.state = AuthState::NeedsRegistration;
        Ok(self.state)
    }

    pub async fn register(
        &mut self,
        password: &str,
        confirm: &str,
        birth_year: Option<i32>,
    ) -> ClientResult<AuthState> {
        if self.state != AuthState::NeedsRegistration {
            return Err(ClientError::Validation("registration is not expected now".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ClientError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if password != confirm {
            return Err(ClientError::Validation("Passwords do not match".into()));
        }
        if birth_year.is_some_and(|y| !(MIN_BIRTH_YEAR..=MAX_BIRTH_YEAR).contains(&y)) {
            return Err(ClientError::Validation(format!(
                "Please enter a valid birth year ({MIN_BIRTH_YEAR}-{MAX_BIRTH_YEAR})"
            )));
        }

        let username = self.session.username().clone();
        let token = self.api.register(&username, password, birth_year).await?;
        self.session.set_token(token)?;
        if let Some(year) = birth_year {
            self.session.cache().set_birth_year(year)?;
        }
        info!(%username, "registered");
        self.state = AuthState::Authenticated;
        Ok(self.state)
    }

    pub async fn login(&mut self, password: &str) -> ClientResult<AuthState> {
        if self.state != AuthState::NeedsLogin {
            return Err(ClientError::Validation("login is not expected now".into()));
        }
        if password.is_empty() {
            return Err(ClientError::Validation("Please enter your password".into()));
        }
        let username = self.session.username().clone();
        let token = self.api.login(&username, password).await?;
        self.session.set_token(token)?;
        info!(%username, "logged in");
        self.state = AuthState::Authenticated;
        Ok(self.state)
    }

    /// Asks for the password again before the current week is edited. The
    /// session token is left as it is; a wrong password comes back as the
    /// server's 401.
    pub async fn confirm_password(&self, password: &str) -> ClientResult<()> {
        if !matches!(self.state, AuthState::Authenticated | AuthState::Synced) {
            return Err(ClientError::NotAuthenticated);
        }
        if password.is_empty() {
            return Err(ClientError::Validation("Please enter your password".into()));
        }
        let username = self.session.username();
        self.api.login(username, password).await?;
        debug!(%username, "password confirmed for editing");
        Ok(())
    }

    /// Loads server state into the cache and hands the session to a
    /// [`SyncOrchestrator`].
    pub async fn sync(&mut self) -> ClientResult<SyncOrchestrator> {
        if !matches!(self.state, AuthState::Authenticated | AuthState::Synced) {
            return Err(ClientError::NotAuthenticated);
        }
        let sync = SyncOrchestrator::new(self.api.clone(), self.session.clone());
        sync.load().await?;
        self.state = AuthState::Synced;
        Ok(sync)
    }
}
