//! Source loaders: one raw JSON fragment from one named origin.
//!
//! Three kinds of origin exist: GitHub-style resource paths fetched through
//! a mirror list, plain remote URLs fetched verbatim, and local JSON5 files.
//! Sources load strictly one at a time; each owns its fragment independently.
//!
//! A source may carry an explicit fallback text (e.g. `"[]"`), consumed only
//! when every mirror has failed. Without one, exhaustion is fatal for the
//! run.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::fetch::{FetchError, MirrorClient};

/// Errors from loading or saving a source fragment.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Remote fetch failed on every mirror.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A local file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A local file is not valid under the semi-strict JSON dialect.
    #[error("{path} is not valid JSON5: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },

    /// A source's built-in fallback text is not valid JSON5.
    #[error("fallback text for {name} is not valid JSON5: {source}")]
    Fallback {
        name: String,
        #[source]
        source: json5::Error,
    },

    /// A fragment could not be written out for inspection.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Where a source's bytes come from.
#[derive(Debug, Clone)]
enum Origin {
    /// Resource path fetched through an ordered mirror list.
    Github { path: String, mirrors: Vec<String> },
    /// Full URL fetched verbatim (the empty-mirror sentinel).
    Remote { url: String },
    /// Local JSON5 file.
    Local { path: PathBuf },
}

/// A named configuration origin producing one raw JSON fragment per run.
#[derive(Debug, Clone)]
pub struct Source {
    name: String,
    origin: Origin,
    fallback: Option<String>,
}

impl Source {
    /// A GitHub-style resource path fetched through `mirrors` in order.
    pub fn github(name: impl Into<String>, path: impl Into<String>, mirrors: &[&str]) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Github {
                path: path.into(),
                mirrors: mirrors.iter().map(|m| m.to_string()).collect(),
            },
            fallback: None,
        }
    }

    /// A plain remote URL, fetched as-is.
    pub fn remote(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Remote { url: url.into() },
            fallback: None,
        }
    }

    /// A local JSON5 override file.
    pub fn local(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Local { path: path.into() },
            fallback: None,
        }
    }

    /// Sets an explicit fallback text used only on mirror exhaustion.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Loads this source's raw fragment.
    pub async fn load(&self, client: &MirrorClient) -> Result<Value> {
        let value = match &self.origin {
            Origin::Github { path, mirrors } => {
                let mirrors: Vec<&str> = mirrors.iter().map(String::as_str).collect();
                self.fetch(client, path, &mirrors).await?
            }
            Origin::Remote { url } => self.fetch(client, url, &[""]).await?,
            Origin::Local { path } => {
                let text = fs::read_to_string(path).map_err(|source| SourceError::Read {
                    path: path.clone(),
                    source,
                })?;
                json5::from_str(&text).map_err(|source| SourceError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
        };
        tracing::info!("Loaded {} config", self.name);
        Ok(value)
    }

    async fn fetch(&self, client: &MirrorClient, path: &str, mirrors: &[&str]) -> Result<Value> {
        match client.fetch_json(&self.name, path, mirrors).await {
            Ok(value) => Ok(value),
            Err(err @ FetchError::MirrorsExhausted { .. }) => {
                let Some(fallback) = &self.fallback else {
                    return Err(err.into());
                };
                tracing::warn!("{err}; using the built-in default for {}", self.name);
                json5::from_str(fallback).map_err(|source| SourceError::Fallback {
                    name: self.name.clone(),
                    source,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Writes a loaded fragment out as pretty-printed JSON for inspection.
pub fn save_fragment(name: &str, value: &Value, path: &Path) -> Result<()> {
    // Value serialization cannot fail; write errors can.
    let text = serde_json::to_string_pretty(value).unwrap_or_default();
    fs::write(path, text).map_err(|source| SourceError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Saved {} config to {}", name, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn local_source_parses_json5() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                // local override
                server: {{ setting: {{ overwall: true, }}, }},
            }}"#
        )
        .unwrap();

        let source = Source::local("local overrides", file.path());
        let value = tokio_test::block_on(source.load(&MirrorClient::new().unwrap())).unwrap();
        assert_eq!(value["server"]["setting"]["overwall"], true);
    }

    #[test]
    fn local_source_reports_missing_file() {
        let source = Source::local("local overrides", "does/not/exist.json5");
        let err = tokio_test::block_on(source.load(&MirrorClient::new().unwrap())).unwrap_err();
        assert!(matches!(err, SourceError::Read { .. }));
    }

    #[test]
    fn save_fragment_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fragment.json");
        let value = json!({"server": {"intercepts": {}}});

        save_fragment("test", &value, &path).unwrap();
        let reread: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reread, value);
    }
}
