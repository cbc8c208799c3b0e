use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    #[error("server answered {status}: {message}")]
    Http { status: u16, message: String },

    #[error("local cache error: {0}")]
    Cache(String),

    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    #[error("page path does not name a user")]
    MissingUsername,

    #[error("not authenticated")]
    NotAuthenticated,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ClientError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => ClientError::Network(e.to_string()),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Cache(e.to_string())
    }
}
