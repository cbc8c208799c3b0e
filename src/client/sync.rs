use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use time::Date;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::api::LifeApi;
use super::calendar::{current_week_index, week_key_from_index, WeekKey};
use super::error::{ClientError, ClientResult};
use super::session::Session;
use crate::ai::dto::JournalTextRequest;
use crate::ai::fallback::{fallback_comment, fallback_recommendation, NO_ENTRY_RECOMMENDATION};
use crate::ai::services::{first_line, PLACEHOLDER_COMMENT, PLACEHOLDER_RECOMMENDATION};
use crate::users::repo_types::{JournalEntry, UserState, MAX_BIRTH_YEAR, MIN_BIRTH_YEAR};

/// Counters for background pushes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub pushes_started: u64,
    pub pushes_succeeded: u64,
    pub pushes_failed: u64,
    /// Never sent because a newer push was already queued behind it.
    pub pushes_discarded: u64,
    pub last_error: Option<String>,
}

/// Where the cache contents came from after [`SyncOrchestrator::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Server,
    Local,
}

#[derive(Default)]
struct PushTracker {
    next_seq: AtomicU64,
    stats: Mutex<SyncStats>,
    /// Held across the request so documents reach the server in order.
    gate: tokio::sync::Mutex<()>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl PushTracker {
    fn stats(&self) -> MutexGuard<'_, SyncStats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn in_flight(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats().pushes_started += 1;
        seq
    }

    fn newest(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }

    fn superseded(&self, seq: u64) {
        self.stats().pushes_discarded += 1;
        debug!(seq, newest = self.newest(), "newer push queued; skipping stale document");
    }

    fn finish(&self, seq: u64, result: ClientResult<()>) {
        let mut stats = self.stats();
        match result {
            Ok(()) => stats.pushes_succeeded += 1,
            Err(e) => {
                warn!(seq, error = %e, "background push failed");
                stats.pushes_failed += 1;
                stats.last_error = Some(e.to_string());
            }
        }
    }
}

/// Keeps the local cache and the server document in step once the user is
/// authenticated. Local writes happen first; the server copy is updated by
/// fire-and-forget pushes of the whole document.
pub struct SyncOrchestrator {
    api: Arc<dyn LifeApi>,
    session: Session,
    pushes: Arc<PushTracker>,
}

impl SyncOrchestrator {
    pub fn new(api: Arc<dyn LifeApi>, session: Session) -> Self {
        Self {
            api,
            session,
            pushes: Arc::new(PushTracker::default()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stats(&self) -> SyncStats {
        self.pushes.stats().clone()
    }

    /// A non-empty server document replaces the cache; an empty one or a
    /// failed fetch leaves the cache as it is.
    pub async fn load(&self) -> ClientResult<LoadSource> {
        let token = self.session.token().ok_or(ClientError::NotAuthenticated)?;
        let username = self.session.username();
        match self.api.fetch_state(username, token).await {
            Ok(state) if !state.is_empty() => {
                self.session.cache().apply(&state)?;
                debug!(%username, "local cache replaced by server state");
                Ok(LoadSource::Server)
            }
            Ok(_) => Ok(LoadSource::Local),
            Err(e) => {
                warn!(%username, error = %e, "server state unavailable; using local cache");
                Ok(LoadSource::Local)
            }
        }
    }

    pub fn state(&self) -> ClientResult<UserState> {
        self.session.cache().state()
    }

    pub fn set_birth_year(&self, year: i32) -> ClientResult<()> {
        if !(MIN_BIRTH_YEAR..=MAX_BIRTH_YEAR).contains(&year) {
            return Err(ClientError::Validation(format!(
                "Birth year must be between {MIN_BIRTH_YEAR} and {MAX_BIRTH_YEAR}"
            )));
        }
        self.session.cache().set_birth_year(year)?;
        self.push();
        Ok(())
    }

    /// Commits this week's entry. The AI comment survives when keywords and
    /// text are unchanged and is regenerated otherwise.
    pub async fn plant(
        &self,
        keywords: &str,
        text: &str,
        today: Date,
    ) -> ClientResult<JournalEntry> {
        let cache = self.session.cache();
        let birth_year = cache.birth_year()?;
        let key = week_key_from_index(birth_year, current_week_index(birth_year, today));
        let existing = cache.entry(&key)?;

        let unchanged = existing
            .as_ref()
            .is_some_and(|e| e.keywords == keywords && e.text == text);
        let ai_comment = match existing.and_then(|e| e.ai_comment) {
            Some(comment) if unchanged => Some(comment),
            _ if keywords.is_empty() && text.is_empty() => None,
            _ => Some(self.generate_comment(&key, keywords, text).await),
        };

        let entry = JournalEntry {
            keywords: keywords.to_string(),
            text: text.to_string(),
            ai_comment,
        };
        cache.set_entry(&key, entry.clone())?;
        cache.mark_filled(&key)?;
        info!(username = %self.session.username(), week = %key, "week planted");
        self.push();
        Ok(entry)
    }

    /// Generates and stores a comment for an entry that has content but none yet.
    pub async fn ensure_comment(&self, key: &WeekKey) -> ClientResult<Option<String>> {
        let cache = self.session.cache();
        let Some(mut entry) = cache.entry(key)? else {
            return Ok(None);
        };
        if entry.ai_comment.is_some() {
            return Ok(entry.ai_comment);
        }
        if !entry.has_content() {
            return Ok(None);
        }
        let comment = self.generate_comment(key, &entry.keywords, &entry.text).await;
        entry.ai_comment = Some(comment.clone());
        cache.set_entry(key, entry)?;
        self.push();
        Ok(Some(comment))
    }

    /// One suggestion for next week based on this week's entry.
    pub async fn recommend_next_week(&self, today: Date) -> ClientResult<String> {
        let key = WeekKey::for_date(today);
        let entry = self.session.cache().entry(&key)?.unwrap_or_default();
        if !entry.has_content() {
            return Ok(NO_ENTRY_RECOMMENDATION.to_string());
        }
        let req = request(&key, &entry.keywords, &entry.text);
        let answer = self.api.recommend(&req).await;
        Ok(usable(answer, PLACEHOLDER_RECOMMENDATION)
            .unwrap_or_else(|| fallback_recommendation(&entry.keywords, &entry.text)))
    }

    async fn generate_comment(&self, key: &WeekKey, keywords: &str, text: &str) -> String {
        let answer = self.api.comment(&request(key, keywords, text)).await;
        usable(answer, PLACEHOLDER_COMMENT).unwrap_or_else(|| fallback_comment(keywords, text))
    }

    /// Sends the whole cached document in the background. Pushes go out one
    /// at a time in the order they were started, and a push that still waits
    /// when a newer one starts is dropped. Returns `false` when there is no
    /// token to send it with.
    pub fn push(&self) -> bool {
        let Some(token) = self.session.token().map(str::to_string) else {
            debug!("no token; push skipped");
            return false;
        };
        let state = match self.session.cache().state() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "could not read local state for push");
                return false;
            }
        };

        let seq = self.pushes.begin();
        let api = self.api.clone();
        let tracker = self.pushes.clone();
        let username = self.session.username().clone();
        let handle = tokio::spawn(async move {
            let _turn = tracker.gate.lock().await;
            if seq < tracker.newest() {
                tracker.superseded(seq);
                return;
            }
            let result = api.push_state(&username, &token, &state).await;
            tracker.finish(seq, result);
        });

        let mut in_flight = self.pushes.in_flight();
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
        true
    }

    /// Waits for every push started so far.
    pub async fn flush(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.pushes.in_flight());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "push task aborted");
            }
        }
    }
}

fn request(key: &WeekKey, keywords: &str, text: &str) -> JournalTextRequest {
    JournalTextRequest {
        keywords: keywords.to_string(),
        text: text.to_string(),
        year: Some(key.year),
        week: Some(key.week),
    }
}

/// The first line of a service answer, unless it failed, is blank or is the
/// service's own placeholder.
fn usable(answer: ClientResult<String>, placeholder: &str) -> Option<String> {
    match answer {
        Ok(text) => {
            let line = first_line(&text);
            (!line.is_empty() && line != placeholder).then_some(line)
        }
        Err(e) => {
            warn!(error = %e, "AI text unavailable; using local fallback");
            None
        }
    }
}
