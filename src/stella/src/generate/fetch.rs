//! Upstream fetching
//!
//! The pipeline only ever sees the [`Fetcher`] trait, so a run can pull from
//! the live origins ([`HttpFetcher`]) or from a local mirror of them
//! ([`LocalFetcher`]).

use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use std::hash::Hash;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

/// Errors fetching an upstream resource
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{url} is not valid JSON: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of upstream documents
pub trait Fetcher: Send + Sync {
    /// Fetch the raw body at `url`; any non-success status is an error
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Fetch and parse a JSON document
    fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let bytes = self.fetch_bytes(url)?;
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Json {
            url: url.to_string(),
            source,
        })
    }
}

/// Fetches over HTTP(S) with one shared connection pool
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("stella/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => FetchError::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => FetchError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|source| FetchError::Body {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes)
    }
}

/// Serves URLs from a directory mirroring one or more origins.
///
/// `https://origin/EN/bin/Item.json` resolves to `<root>/EN/bin/Item.json`
/// when `https://origin` is one of the mirrored origins.
pub struct LocalFetcher {
    root: PathBuf,
    origins: Vec<String>,
}

impl LocalFetcher {
    pub fn new(root: impl Into<PathBuf>, origins: &[&str]) -> Self {
        Self {
            root: root.into(),
            origins: origins
                .iter()
                .map(|o| o.trim_end_matches('/').to_string())
                .collect(),
        }
    }
}

impl Fetcher for LocalFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let relative = self
            .origins
            .iter()
            .find_map(|origin| url.strip_prefix(origin.as_str()))
            .ok_or_else(|| FetchError::Transport {
                url: url.to_string(),
                message: "not under a mirrored origin".to_string(),
            })?;

        let path = self.root.join(relative.trim_start_matches('/'));
        std::fs::read(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => FetchError::Status {
                url: url.to_string(),
                status: 404,
            },
            _ => FetchError::Body {
                url: url.to_string(),
                source,
            },
        })
    }
}

/// Fetch every keyed JSON resource concurrently; the first failure fails all.
pub fn fetch_all<K, F>(fetcher: &F, resources: &[(K, String)]) -> Result<HashMap<K, Value>, FetchError>
where
    K: Copy + Eq + Hash + Send + Sync,
    F: Fetcher + ?Sized,
{
    resources
        .par_iter()
        .map(|(key, url)| {
            tracing::debug!(%url, "fetching");
            fetcher.fetch_json(url).map(|value| (*key, value))
        })
        .collect()
}
