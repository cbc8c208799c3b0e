use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use tracing::warn;

use super::calendar::WeekKey;
use super::error::{ClientError, ClientResult};
use crate::users::repo_types::{JournalEntry, UserState, Username};

const KEY_PREFIX: &str = "lifegrass_";
pub const DEFAULT_BIRTH_YEAR: i32 = 1995;

const BIRTH_YEAR: &str = "birthYear";
const FILLED_WEEKS: &str = "filledWeeks";
const JOURNAL: &str = "journal";
const TOKEN: &str = "token";

/// Flat string key-value store, the shape of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryKeyValue {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValue {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryKeyValue {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// All entries in one JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileKeyValue {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyValue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> ClientResult<BTreeMap<String, String>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ClientError::Cache(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> ClientResult<()> {
        let bytes =
            serde_json::to_vec_pretty(entries).map_err(|e| ClientError::Cache(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> ClientResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStore for FileKeyValue {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// One user's slice of the local store: birth year, filled weeks, journal and
/// token under `lifegrass_<username>_<field>`.
///
/// Unreadable values are logged and treated as absent so the page stays usable.
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
    username: Username,
}

impl LocalCache {
    pub fn new(store: Arc<dyn KeyValueStore>, username: Username) -> Self {
        Self { store, username }
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn key(&self, field: &str) -> String {
        format!("{KEY_PREFIX}{}_{field}", self.username)
    }

    fn read_json<T: DeserializeOwned + Default>(&self, field: &str) -> ClientResult<T> {
        let key = self.key(field);
        let Some(raw) = self.store.get(&key)? else {
            return Ok(T::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(%key, error = %e, "ignoring unreadable cache entry");
            T::default()
        }))
    }

    fn write_json<T: serde::Serialize>(&self, field: &str, value: &T) -> ClientResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| ClientError::Cache(e.to_string()))?;
        self.store.set(&self.key(field), &raw)
    }

    /// Stored birth year, or 1995 when unset.
    pub fn birth_year(&self) -> ClientResult<i32> {
        let raw = self.store.get(&self.key(BIRTH_YEAR))?;
        Ok(raw
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_BIRTH_YEAR))
    }

    pub fn set_birth_year(&self, year: i32) -> ClientResult<()> {
        self.store.set(&self.key(BIRTH_YEAR), &year.to_string())
    }

    pub fn filled_weeks(&self) -> ClientResult<Vec<String>> {
        self.read_json(FILLED_WEEKS)
    }

    pub fn set_filled_weeks(&self, weeks: &[String]) -> ClientResult<()> {
        self.write_json(FILLED_WEEKS, &weeks)
    }

    /// Adds `key` to the filled set; a key already present is not duplicated.
    pub fn mark_filled(&self, key: &WeekKey) -> ClientResult<()> {
        let mut weeks = self.filled_weeks()?;
        let key = key.to_string();
        if !weeks.contains(&key) {
            weeks.push(key);
            self.set_filled_weeks(&weeks)?;
        }
        Ok(())
    }

    pub fn journal(&self) -> ClientResult<BTreeMap<String, JournalEntry>> {
        self.read_json(JOURNAL)
    }

    pub fn set_journal(&self, journal: &BTreeMap<String, JournalEntry>) -> ClientResult<()> {
        self.write_json(JOURNAL, journal)
    }

    pub fn entry(&self, key: &WeekKey) -> ClientResult<Option<JournalEntry>> {
        Ok(self.journal()?.remove(&key.to_string()))
    }

    pub fn set_entry(&self, key: &WeekKey, entry: JournalEntry) -> ClientResult<()> {
        let mut journal = self.journal()?;
        journal.insert(key.to_string(), entry);
        self.set_journal(&journal)
    }

    pub fn token(&self) -> ClientResult<Option<String>> {
        Ok(self.store.get(&self.key(TOKEN))?.filter(|t| !t.is_empty()))
    }

    pub fn set_token(&self, token: &str) -> ClientResult<()> {
        self.store.set(&self.key(TOKEN), token)
    }

    pub fn clear_token(&self) -> ClientResult<()> {
        self.store.remove(&self.key(TOKEN))
    }

    /// The full document pushed to the server.
    pub fn state(&self) -> ClientResult<UserState> {
        Ok(UserState {
            birth_year: Some(self.birth_year()?),
            filled_weeks: self.filled_weeks()?,
            journal: self.journal()?,
        })
    }

    /// Replaces cached fields with the server's; an absent birth year keeps the local one.
    pub fn apply(&self, state: &UserState) -> ClientResult<()> {
        if let Some(year) = state.birth_year {
            self.set_birth_year(year)?;
        }
        self.set_filled_weeks(&state.filled_weeks)?;
        self.set_journal(&state.journal)
    }

    /// Removes every key this user owns, token included.
    pub fn clear_all(&self) -> ClientResult<()> {
        for field in [BIRTH_YEAR, FILLED_WEEKS, JOURNAL, TOKEN] {
            self.store.remove(&self.key(field))?;
        }
        Ok(())
    }
}
