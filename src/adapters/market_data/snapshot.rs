use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{is_valid_address, TokenCandidate};
use crate::ports::{MarketDataError, MarketDataPort};

/// Where a snapshot is read from
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotSource {
    File(PathBuf),
    Url(String),
}

impl SnapshotSource {
    /// `http(s)://` becomes a URL, anything else a path
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            SnapshotSource::Url(location.to_string())
        } else {
            SnapshotSource::File(PathBuf::from(location))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    List(Vec<TokenCandidate>),
    Wrapped { tokens: Vec<TokenCandidate> },
}

/// Market data read from a JSON snapshot on every call
#[derive(Debug, Clone)]
pub struct SnapshotMarketData {
    source: SnapshotSource,
    http: Client,
    /// Drop entries whose mint is not a base58 32-byte address
    strict_mints: bool,
}

impl SnapshotMarketData {
    pub fn new(source: SnapshotSource, timeout: Duration) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::RestError(e.to_string()))?;
        Ok(Self {
            source,
            http,
            strict_mints: false,
        })
    }

    pub fn with_strict_mints(mut self, strict: bool) -> Self {
        self.strict_mints = strict;
        self
    }

    async fn read_raw(&self) -> Result<String, MarketDataError> {
        match &self.source {
            SnapshotSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| MarketDataError::Unavailable(format!("{}: {}", path.display(), e))),
            SnapshotSource::Url(url) => {
                let response = self.http.get(url).send().await.map_err(|e| {
                    if e.is_timeout() {
                        MarketDataError::Timeout
                    } else {
                        MarketDataError::RestError(e.to_string())
                    }
                })?;
                if !response.status().is_success() {
                    return Err(MarketDataError::RestError(format!("HTTP {}", response.status())));
                }
                response
                    .text()
                    .await
                    .map_err(|e| MarketDataError::RestError(e.to_string()))
            }
        }
    }
}

/// Parse a snapshot body: a bare array or `{"tokens": [...]}`
pub fn parse_snapshot(raw: &str) -> Result<Vec<TokenCandidate>, MarketDataError> {
    let document: SnapshotDocument =
        serde_json::from_str(raw).map_err(|e| MarketDataError::ParseError(e.to_string()))?;
    let tokens = match document {
        SnapshotDocument::List(tokens) => tokens,
        SnapshotDocument::Wrapped { tokens } => tokens,
    };
    Ok(tokens.into_iter().filter(|t| !t.mint.is_empty()).collect())
}

#[async_trait]
impl MarketDataPort for SnapshotMarketData {
    async fn list_candidates(&self) -> Result<Vec<TokenCandidate>, MarketDataError> {
        let raw = self.read_raw().await?;
        let mut tokens = parse_snapshot(&raw)?;
        if self.strict_mints {
            let before = tokens.len();
            tokens.retain(|t| is_valid_address(&t.mint));
            if tokens.len() < before {
                tracing::warn!("Dropped {} snapshot entries with invalid mints", before - tokens.len());
            }
        }
        tracing::debug!("Snapshot listed {} candidates", tokens.len());
        Ok(tokens)
    }
}
