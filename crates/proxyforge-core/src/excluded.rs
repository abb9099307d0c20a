//! Excluded-domain set: domains that must not be proxied.
//!
//! Loaded once at startup from a JSON5 array of plain domain strings and
//! passed by reference into conversion and key subtraction. Immutable for
//! the lifetime of a run; there is no ambient global list.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::source::SourceError;

/// Set of plain domain strings excluded from the assembled configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedDomains {
    domains: HashSet<String>,
}

impl ExcludedDomains {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from an iterator of domain strings.
    pub fn from_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domains: domains.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a JSON5 array of domain strings.
    pub fn from_json5(text: &str) -> Result<Self, json5::Error> {
        let domains: Vec<String> = json5::from_str(text)?;
        Ok(Self::from_domains(domains))
    }

    /// Reads and parses the excluded-domain list from a JSON5 file.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let text = fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let excluded = Self::from_json5(&text).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            "Loaded {} excluded domains from {}",
            excluded.len(),
            path.display()
        );
        Ok(excluded)
    }

    /// Returns true if `domain` is excluded.
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    /// Number of excluded domains.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns true if no domains are excluded.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
