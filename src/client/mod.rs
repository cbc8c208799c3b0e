//! Browser-side half of the app: local cache, auth flow and background sync,
//! speaking the same HTTP JSON API as the server in this crate.

pub mod api;
pub mod auth_flow;
pub mod cache;
pub mod calendar;
pub mod error;
#[cfg(test)]
mod mock;
pub mod session;
pub mod sync;

pub use api::{HttpApi, LifeApi};
pub use auth_flow::{AuthFlow, AuthState};
pub use cache::{FileKeyValue, KeyValueStore, LocalCache, MemoryKeyValue};
pub use error::{ClientError, ClientResult};
pub use session::Session;
pub use sync::{LoadSource, SyncOrchestrator, SyncStats};
