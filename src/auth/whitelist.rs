//! User whitelist loaded from a newline-delimited file.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::types::Email;

/// Immutable allow-list of user identities.
///
/// Entries are lower-cased and trimmed; blank lines are dropped so that a
/// session with an empty email can never match.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    entries: Vec<String>,
    index: HashSet<String>,
}

impl Whitelist {
    /// Build a whitelist from raw entries, normalizing each one.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: Vec<String> = entries
            .into_iter()
            .map(|row| row.as_ref().trim().to_lowercase())
            .filter(|row| !row.is_empty())
            .collect();
        let index = entries.iter().cloned().collect();
        Self { entries, index }
    }

    /// Parse newline-delimited text.
    pub fn parse(contents: &str) -> Self {
        Self::from_entries(contents.split('\n'))
    }

    /// Read and parse the whitelist at `path`, surfacing I/O errors.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read user whitelist {}", path.display()))?;
        Ok(Self::parse(&contents))
    }

    /// Read the whitelist at `path`, falling back to an empty list.
    ///
    /// Never fails: a missing or unreadable file is logged and yields an
    /// empty whitelist.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(whitelist) => {
                info!(path = %path.display(), entries = whitelist.len(), "loaded user whitelist");
                whitelist
            }
            Err(e) => {
                warn!(path = %path.display(), "failed to load user whitelist: {:#}", e);
                Self::default()
            }
        }
    }

    /// Case-insensitive membership check.
    pub fn contains(&self, email: &Email) -> bool {
        self.index.contains(&email.normalized())
    }

    /// Entries in file order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
