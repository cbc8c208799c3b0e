use serde::{Deserialize, Serialize};

/// Bearer token payload. Self-contained: nothing about issued tokens is stored
/// server-side, so a token stays valid until it expires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // normalized username
    pub iat: i64,    // issued at (unix seconds)
    pub exp: i64,    // iat + ttl
    pub iss: String,
    pub aud: String,
}
