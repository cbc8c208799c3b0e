use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use super::claims::Claims;
use crate::{
    config::TokenConfig,
    error::AppError,
    state::AppState,
    users::repo_types::Username,
};

/// Issues and verifies stateless HS256 bearer tokens.
///
/// There is no session table, so verification needs no storage lookup and a
/// token cannot be revoked before it expires. HMAC comparison inside
/// `jsonwebtoken` is constant-time.
#[derive(Clone)]
pub struct TokenKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.token)
    }
}

impl TokenKeys {
    pub fn new(cfg: &TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    pub fn issue(&self, username: &Username) -> anyhow::Result<String> {
        self.issue_at(username, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        username: &Username,
        issued_at: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let claims = Claims {
            sub: username.as_str().to_string(),
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + self.ttl).unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(%username, "token issued");
        Ok(token)
    }

    /// Checks signature, issuer, audience and age. Returns the claims.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;

        let age = OffsetDateTime::now_utc().unix_timestamp() - claims.iat;
        if age > self.ttl.whole_seconds() {
            anyhow::bail!("token older than its lifetime");
        }
        Ok(claims)
    }

    /// Valid iff the token verifies and names exactly `expected`.
    pub fn verify_for(&self, token: &str, expected: &Username) -> Result<(), AppError> {
        let claims = self.verify(token).map_err(|e| {
            warn!(error = %e, username = %expected, "invalid or expired token");
            AppError::Unauthorized("Unauthorized".into())
        })?;
        if claims.sub != expected.as_str() {
            warn!(subject = %claims.sub, username = %expected, "token subject mismatch");
            return Err(AppError::Unauthorized("Unauthorized".into()));
        }
        Ok(())
    }
}
