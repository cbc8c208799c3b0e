use axum::extract::FromRef;
use tracing::{info, warn};

use super::jwt::TokenKeys;
use super::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::repo::UserRepository;
use crate::users::repo_types::{validate_birth_year, UserState, Username};

pub const MIN_USERNAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 4;

/// Password credentials kept inside each user's document.
#[derive(Clone)]
pub struct CredentialStore {
    users: UserRepository,
    keys: TokenKeys,
}

impl FromRef<AppState> for CredentialStore {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users(), TokenKeys::from_ref(state))
    }
}

impl CredentialStore {
    pub fn new(users: UserRepository, keys: TokenKeys) -> Self {
        Self { users, keys }
    }

    /// Creates the user with an empty journal and returns a fresh token.
    pub async fn register(
        &self,
        raw_username: &str,
        password: &str,
        birth_year: Option<i32>,
    ) -> AppResult<String> {
        let username = Username::parse(raw_username).map_err(|_| too_short_username())?;
        if username.as_str().len() < MIN_USERNAME_LEN {
            return Err(too_short_username());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        validate_birth_year(birth_year)?;

        if self.users.exists(&username).await? {
            warn!(%username, "username already taken");
            return Err(AppError::Conflict("Username already taken".into()));
        }

        let hash = hash_password(password).map_err(|e| AppError::Internal(e.to_string()))?;
        let state = UserState {
            birth_year,
            ..Default::default()
        };
        self.users.save(&username, &state, Some(&hash)).await?;

        info!(%username, "user registered");
        self.issue(&username)
    }

    /// False for unknown users and for records without a credential.
    pub async fn verify(&self, username: &Username, password: &str) -> AppResult<bool> {
        let Some(record) = self.users.find(username).await? else {
            return Ok(false);
        };
        Ok(record
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(password, hash)))
    }

    pub async fn login(&self, raw_username: &str, password: &str) -> AppResult<String> {
        let username = Username::parse(raw_username)?;
        if password.is_empty() {
            return Err(AppError::InvalidInput("Password required".into()));
        }
        if !self.verify(&username, password).await? {
            warn!(%username, "login rejected");
            return Err(AppError::Unauthorized("Invalid password".into()));
        }
        info!(%username, "user logged in");
        self.issue(&username)
    }

    fn issue(&self, username: &Username) -> AppResult<String> {
        self.keys
            .issue(username)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }
}

fn too_short_username() -> AppError {
    AppError::InvalidInput(format!(
        "Username must be at least {MIN_USERNAME_LEN} characters"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::from_ref(&AppState::fake())
    }

    #[tokio::test]
    async fn register_then_login_with_same_password() {
        let store = store();
        let token = store.register("Alice", "pass1234", None).await.unwrap();
        assert!(!token.is_empty());

        let alice = Username::parse("alice").unwrap();
        assert!(store.verify(&alice, "pass1234").await.unwrap());
        assert!(store.login("alice", "pass1234").await.is_ok());
        assert!(matches!(
            store.login("alice", "pass12345").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_bad_shapes() {
        let store = store();
        store.register("bob", "secret", Some(1990)).await.unwrap();
        assert!(matches!(
            store.register("BOB", "another", None).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            store.register("x", "secret", None).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            store.register("!!", "secret", None).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            store.register("carol", "abc", None).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            store.register("carol", "secret", Some(1800)).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn verify_fails_closed_for_unknown_user() {
        let store = store();
        let ghost = Username::parse("ghost").unwrap();
        assert!(!store.verify(&ghost, "whatever").await.unwrap());
        assert!(matches!(
            store.login("ghost", "whatever").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn verify_fails_closed_for_record_without_credential() {
        let state = AppState::fake();
        let dave = Username::parse("dave").unwrap();
        state
            .users()
            .save(&dave, &UserState::default(), None)
            .await
            .unwrap();
        assert!(!CredentialStore::from_ref(&state)
            .verify(&dave, "anything")
            .await
            .unwrap());
    }
}
