//! Token Blacklist
//!
//! Append-mostly set of mints that must never be traded. Entries do not
//! expire; they are only removed by an explicit request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Severity of a manipulation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// Who put the mint on the blacklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddedBy {
    System,
    Wallet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub token_mint: String,
    pub reason: String,
    pub severity: Severity,
    pub added_by: AddedBy,
    pub created_at: DateTime<Utc>,
}

impl BlacklistEntry {
    pub fn system(token_mint: &str, reason: String, severity: Severity, now: DateTime<Utc>) -> Self {
        Self {
            token_mint: token_mint.to_string(),
            reason,
            severity,
            added_by: AddedBy::System,
            created_at: now,
        }
    }

    pub fn manual(token_mint: &str, reason: String, now: DateTime<Utc>) -> Self {
        Self {
            token_mint: token_mint.to_string(),
            reason,
            severity: Severity::Critical,
            added_by: AddedBy::Wallet,
            created_at: now,
        }
    }
}

/// In-memory view of a wallet's blacklist
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    entries: HashMap<String, BlacklistEntry>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = BlacklistEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.token_mint.clone(), e))
                .collect(),
        }
    }

    /// Insert an entry. Returns false if the mint was already present; the
    /// original entry is kept in that case.
    pub fn insert(&mut self, entry: BlacklistEntry) -> bool {
        if self.entries.contains_key(&entry.token_mint) {
            return false;
        }
        self.entries.insert(entry.token_mint.clone(), entry);
        true
    }

    pub fn remove(&mut self, mint: &str) -> Option<BlacklistEntry> {
        self.entries.remove(mint)
    }

    pub fn contains(&self, mint: &str) -> bool {
        self.entries.contains_key(mint)
    }

    pub fn get(&self, mint: &str) -> Option<&BlacklistEntry> {
        self.entries.get(mint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &BlacklistEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let now = Utc::now();
        let mut list = Blacklist::new();
        assert!(list.insert(BlacklistEntry::system("m1", "first".into(), Severity::Critical, now)));
        assert!(!list.insert(BlacklistEntry::manual("m1", "second".into(), now)));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("m1").unwrap().reason, "first");
    }

    #[test]
    fn test_explicit_removal_only() {
        let now = Utc::now();
        let mut list = Blacklist::from_entries(vec![BlacklistEntry::manual("m1", "rug".into(), now)]);
        assert!(list.contains("m1"));
        let removed = list.remove("m1").unwrap();
        assert_eq!(removed.added_by, AddedBy::Wallet);
        assert!(!list.contains("m1"));
        assert!(list.is_empty());
    }
}
