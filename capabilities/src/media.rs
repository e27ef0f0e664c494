//! Stock media capability: Pexels-style video search and download.
//!
//! `media.search_video` resolves a search phrase to a local `.mp4` path:
//! it queries the provider's `/videos/search` endpoint, picks the first HD
//! rendition from the results, and streams it to the download directory.

use std::collections::HashMap;
use std::path::PathBuf;

use futures_util::future::AbortHandle;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{Capability, CapabilityError, CapabilityFut, required_arg};

/// Stock media provider settings.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Provider API key, sent as the `Authorization` header.
    pub api_key: String,
    /// Provider base URL. Overridable for tests.
    pub base_url: String,
}

impl MediaConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.pexels.com".to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<VideoHit>,
}

#[derive(Debug, Deserialize)]
struct VideoHit {
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    #[serde(default)]
    quality: String,
    link: String,
}

/// `media.search_video`: takes `query` (required) and `orientation`
/// (`portrait|landscape|square|all`, default `all`); returns the local path
/// of the downloaded video as a JSON string.
pub struct StockMedia {
    client: reqwest::Client,
    config: MediaConfig,
    download_dir: PathBuf,
}

impl StockMedia {
    #[must_use]
    pub fn new(config: MediaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            download_dir: PathBuf::from("videos"),
        }
    }

    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    async fn search_and_download(
        &self,
        query: &str,
        orientation: &str,
        cancel: &AbortHandle,
    ) -> Result<Value, CapabilityError> {
        tracing::info!(%query, %orientation, "searching stock videos");

        let mut request = self
            .client
            .get(format!("{}/videos/search", self.config.base_url))
            .header("Authorization", &self.config.api_key)
            .query(&[("query", query), ("per_page", "5")]);
        // "all" means no orientation filter.
        if orientation != "all" {
            request = request.query(&[("orientation", orientation)]);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, "video search"));
        }

        let results: SearchResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Failed(format!("malformed search response: {e}")))?;
        let video = results
            .videos
            .iter()
            .flat_map(|hit| hit.video_files.iter())
            .find(|file| file.quality == "hd")
            .ok_or_else(|| {
                CapabilityError::Failed(format!("no HD stock video found for `{query}`"))
            })?;

        if cancel.is_aborted() {
            return Err(CapabilityError::Cancelled);
        }

        let path = self.download(&video.link).await?;
        Ok(Value::String(path))
    }

    async fn download(&self, url: &str) -> Result<String, CapabilityError> {
        let response = self.client.get(url).send().await.map_err(classify_transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, "video download"));
        }
        let bytes = response.bytes().await.map_err(classify_transport)?;

        let file_name = format!("{}.mp4", Uuid::new_v4().simple());
        let path = self.download_dir.join(file_name);
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| CapabilityError::Failed(format!("creating download dir: {e}")))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| CapabilityError::Failed(format!("writing {}: {e}", path.display())))?;

        tracing::info!(url, path = %path.display(), "downloaded stock video");
        Ok(path.display().to_string())
    }
}

impl Capability for StockMedia {
    fn invoke<'a>(
        &'a self,
        args: &'a HashMap<String, String>,
        cancel: &'a AbortHandle,
    ) -> CapabilityFut<'a> {
        Box::pin(async move {
            let query = required_arg(args, "query")?;
            let orientation = args.get("orientation").map_or("all", String::as_str);
            self.search_and_download(query, orientation, cancel).await
        })
    }
}

/// Classify a transport-level failure. Connect and timeout errors are
/// transient; anything else is terminal.
fn classify_transport(error: reqwest::Error) -> CapabilityError {
    if error.is_connect() || error.is_timeout() || error.is_request() {
        CapabilityError::transient(error.to_string())
    } else {
        CapabilityError::Failed(error.to_string())
    }
}

/// Classify a non-2xx status. 408/409/429 and 5xx are transient.
fn classify_status(status: StatusCode, context: &str) -> CapabilityError {
    if matches!(status.as_u16(), 408 | 409 | 429 | 500..=599) {
        CapabilityError::transient(format!("{context} returned {status}"))
    } else {
        CapabilityError::Failed(format!("{context} returned {status}"))
    }
}
