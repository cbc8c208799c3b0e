use std::time::Duration;

use axum::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::{ClientError, ClientResult};
use crate::ai::dto::{CommentResponse, JournalTextRequest, RecommendResponse};
use crate::auth::dto::{AuthResponse, ExistsResponse, LoginRequest, RegisterRequest};
use crate::users::dto::OkResponse;
use crate::users::repo_types::{UserState, Username};

/// The HTTP JSON API as seen from the browser side.
#[async_trait]
pub trait LifeApi: Send + Sync {
    async fn check_exists(&self, username: &Username) -> ClientResult<bool>;

    async fn register(
        &self,
        username: &Username,
        password: &str,
        birth_year: Option<i32>,
    ) -> ClientResult<String>;

    async fn login(&self, username: &Username, password: &str) -> ClientResult<String>;

    async fn fetch_state(&self, username: &Username, token: &str) -> ClientResult<UserState>;

    async fn push_state(&self, username: &Username, token: &str, state: &UserState)
        -> ClientResult<()>;

    async fn comment(&self, req: &JournalTextRequest) -> ClientResult<String>;

    async fn recommend(&self, req: &JournalTextRequest) -> ClientResult<String>;
}

#[derive(Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpApi {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    fn data_url(&self, username: &Username) -> String {
        self.url(&format!("/data/{username}"))
    }
}

/// Non-2xx becomes `ClientError::Http` carrying the server's `error` message.
async fn decode<T: DeserializeOwned>(res: Response) -> ClientResult<T> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }
    let text = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    Err(ClientError::Http {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl LifeApi for HttpApi {
    async fn check_exists(&self, username: &Username) -> ClientResult<bool> {
        let res = self
            .http
            .get(self.url(&format!("/auth/check/{username}")))
            .send()
            .await?;
        Ok(decode::<ExistsResponse>(res).await?.exists)
    }

    async fn register(
        &self,
        username: &Username,
        password: &str,
        birth_year: Option<i32>,
    ) -> ClientResult<String> {
        let body = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            birth_year,
        };
        let res = self
            .http
            .post(self.url("/auth/register"))
            .json(&body)
            .send()
            .await?;
        Ok(decode::<AuthResponse>(res).await?.token)
    }

    async fn login(&self, username: &Username, password: &str) -> ClientResult<String> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let res = self
            .http
            .post(self.url("/auth/login"))
            .json(&body)
            .send()
            .await?;
        Ok(decode::<AuthResponse>(res).await?.token)
    }

    async fn fetch_state(&self, username: &Username, token: &str) -> ClientResult<UserState> {
        let res = self
            .http
            .get(self.data_url(username))
            .bearer_auth(token)
            .send()
            .await?;
        decode(res).await
    }

    async fn push_state(
        &self,
        username: &Username,
        token: &str,
        state: &UserState,
    ) -> ClientResult<()> {
        let res = self
            .http
            .post(self.data_url(username))
            .bearer_auth(token)
            .json(state)
            .send()
            .await?;
        let ok = decode::<OkResponse>(res).await?;
        if !ok.ok {
            return Err(ClientError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                message: "save not acknowledged".into(),
            });
        }
        Ok(())
    }

    async fn comment(&self, req: &JournalTextRequest) -> ClientResult<String> {
        let res = self.http.post(self.url("/comment")).json(req).send().await?;
        Ok(decode::<CommentResponse>(res).await?.comment)
    }

    async fn recommend(&self, req: &JournalTextRequest) -> ClientResult<String> {
        let res = self.http.post(self.url("/recommend")).json(req).send().await?;
        Ok(decode::<RecommendResponse>(res).await?.recommendation)
    }
}
