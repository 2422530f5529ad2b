//! Client for the hosted election-results API.
//!
//! The API is a plain REST collaborator: per-municipality results,
//! per-polling-station results and candidate/area status, each a JSON
//! document. Responses pass through intermediary caches, so every request
//! carries a monotonically increasing `_cb` marker.

pub mod registry;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{KommuneId, ValgstedId},
    protocol::ElectionSnapshot,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("election api returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("election api request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("election data source unavailable: {0}")]
    Unavailable(String),
}

/// The REST collaborator seam. The control panel only talks to this trait;
/// tests and offline runs substitute fakes.
#[async_trait]
pub trait ElectionDataSource: Send + Sync {
    async fn kommune_results(&self, kommune: &KommuneId) -> Result<ElectionSnapshot, FetchError>;
    async fn valgsted_results(
        &self,
        kommune: &KommuneId,
        valgsted: &ValgstedId,
    ) -> Result<ElectionSnapshot, FetchError>;
    async fn kandidat_status(&self, kommune: &KommuneId) -> Result<ElectionSnapshot, FetchError>;
}

/// Stand-in used until a real data source is wired up.
pub struct MissingElectionDataSource;

#[async_trait]
impl ElectionDataSource for MissingElectionDataSource {
    async fn kommune_results(&self, kommune: &KommuneId) -> Result<ElectionSnapshot, FetchError> {
        Err(FetchError::Unavailable(format!(
            "no election data source configured (kommune {kommune})"
        )))
    }

    async fn valgsted_results(
        &self,
        kommune: &KommuneId,
        valgsted: &ValgstedId,
    ) -> Result<ElectionSnapshot, FetchError> {
        Err(FetchError::Unavailable(format!(
            "no election data source configured (kommune {kommune} valgsted {valgsted})"
        )))
    }

    async fn kandidat_status(&self, kommune: &KommuneId) -> Result<ElectionSnapshot, FetchError> {
        Err(FetchError::Unavailable(format!(
            "no election data source configured (kommune {kommune})"
        )))
    }
}

pub struct ElectionApiClient {
    http: Client,
    base_url: String,
    cache_buster: AtomicU64,
}

impl ElectionApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        // Seeding from wall-clock keeps the marker increasing across process
        // restarts, which is what actually defeats the intermediary caches.
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_buster: AtomicU64::new(seed),
        }
    }

    fn next_cache_buster(&self) -> u64 {
        self.cache_buster.fetch_add(1, Ordering::Relaxed)
    }

    async fn get_snapshot(&self, path: &str) -> Result<ElectionSnapshot, FetchError> {
        let url = format!(
            "{}/{}?_cb={}",
            self.base_url,
            path,
            self.next_cache_buster()
        );
        debug!(%url, "fetching election data");
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status(),
                url,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ElectionDataSource for ElectionApiClient {
    async fn kommune_results(&self, kommune: &KommuneId) -> Result<ElectionSnapshot, FetchError> {
        self.get_snapshot(&format!("results/{kommune}")).await
    }

    async fn valgsted_results(
        &self,
        kommune: &KommuneId,
        valgsted: &ValgstedId,
    ) -> Result<ElectionSnapshot, FetchError> {
        self.get_snapshot(&format!("results/{kommune}/{valgsted}"))
            .await
    }

    async fn kandidat_status(&self, kommune: &KommuneId) -> Result<ElectionSnapshot, FetchError> {
        self.get_snapshot(&format!("areastatus/{kommune}")).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
