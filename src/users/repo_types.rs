use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AppError;

pub const MIN_BIRTH_YEAR: i32 = 1920;
pub const MAX_BIRTH_YEAR: i32 = 2020;
pub const MAX_USERNAME_LEN: usize = 50;

/// Normalized account name: lowercase `[a-z0-9_-]`, at most 50 characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Sanitizes `raw` the way every endpoint does and rejects names that end up empty.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let name = sanitize(raw);
        if name.is_empty() {
            return Err(AppError::InvalidInput("Invalid username".into()));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn sanitize(raw: &str) -> String {
    lazy_static! {
        static ref DISALLOWED: Regex = Regex::new(r"[^a-z0-9_-]").unwrap();
    }
    DISALLOWED
        .replace_all(&raw.to_lowercase(), "")
        .chars()
        .take(MAX_USERNAME_LEN)
        .collect()
}

pub fn validate_birth_year(year: Option<i32>) -> Result<(), AppError> {
    match year {
        Some(y) if !(MIN_BIRTH_YEAR..=MAX_BIRTH_YEAR).contains(&y) => Err(AppError::InvalidInput(
            format!("Birth year must be between {MIN_BIRTH_YEAR} and {MAX_BIRTH_YEAR}"),
        )),
        _ => Ok(()),
    }
}

/// One week's journal slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_comment: Option<String>,
}

impl JournalEntry {
    pub fn has_content(&self) -> bool {
        !self.keywords.is_empty() || !self.text.is_empty()
    }
}

/// The client-visible part of a user's document; also the sync payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub filled_weeks: Vec<String>,
    #[serde(default)]
    pub journal: BTreeMap<String, JournalEntry>,
}

impl UserState {
    pub fn is_empty(&self) -> bool {
        self.birth_year.is_none() && self.filled_weeks.is_empty() && self.journal.is_empty()
    }
}

/// The persisted document at `users/<username>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub filled_weeks: Vec<String>,
    #[serde(default)]
    pub journal: BTreeMap<String, JournalEntry>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl UserRecord {
    pub fn state(&self) -> UserState {
        UserState {
            birth_year: self.birth_year,
            filled_weeks: self.filled_weeks.clone(),
            journal: self.journal.clone(),
        }
    }
}

/// Admin view of a record: everything except the credential.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRecord {
    pub birth_year: Option<i32>,
    pub filled_weeks: Vec<String>,
    pub journal: BTreeMap<String, JournalEntry>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<UserRecord> for PublicRecord {
    fn from(r: UserRecord) -> Self {
        Self {
            birth_year: r.birth_year,
            filled_weeks: r.filled_weeks,
            journal: r.journal,
            updated_at: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_lowercases_and_strips() {
        assert_eq!(sanitize("Alice"), "alice");
        assert_eq!(sanitize("a.l i@c_e-9"), "alic_e-9");
        assert_eq!(sanitize(&"x".repeat(80)).len(), MAX_USERNAME_LEN);
    }

    #[test]
    fn parse_rejects_names_that_sanitize_to_empty() {
        assert!(Username::parse("!!!").is_err());
        assert_eq!(Username::parse(" Bob ").unwrap().as_str(), "bob");
    }

    #[test]
    fn birth_year_range() {
        assert!(validate_birth_year(None).is_ok());
        assert!(validate_birth_year(Some(1920)).is_ok());
        assert!(validate_birth_year(Some(2020)).is_ok());
        assert!(validate_birth_year(Some(1919)).is_err());
        assert!(validate_birth_year(Some(2021)).is_err());
    }

    #[test]
    fn journal_entry_omits_missing_comment() {
        let entry = JournalEntry {
            keywords: "work".into(),
            text: "busy week".into(),
            ai_comment: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"keywords": "work", "text": "busy week"}));
    }

    #[test]
    fn record_tolerates_sparse_documents() {
        let rec: UserRecord = serde_json::from_str(r#"{"passwordHash":"h"}"#).unwrap();
        assert_eq!(rec.password_hash.as_deref(), Some("h"));
        assert!(rec.state().is_empty());
    }

    #[test]
    fn public_record_has_no_credential() {
        let rec = UserRecord {
            password_hash: Some("secret".into()),
            birth_year: Some(1995),
            ..Default::default()
        };
        let json = serde_json::to_value(PublicRecord::from(rec)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["birthYear"], 1995);
    }
}
