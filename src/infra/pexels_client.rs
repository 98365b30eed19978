use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::app::ports::{Photo, PhotoSearchPort};
use crate::error::{LoungeError, Result};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    src: PhotoSources,
    #[serde(default)]
    photographer: Option<String>,
    #[serde(default)]
    photographer_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    large: String,
}

impl From<PexelsPhoto> for Photo {
    fn from(photo: PexelsPhoto) -> Self {
        Photo {
            url: photo.src.large,
            photographer: photo.photographer,
            photographer_url: photo.photographer_url,
            source_page: photo.url,
        }
    }
}

/// Photo search against a Pexels-compatible `/v1/search` endpoint.
pub struct PexelsClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl PexelsClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl PhotoSearchPort for PexelsClient {
    async fn search(&self, query: &str, per_page: usize) -> Result<Vec<Photo>> {
        let per_page = per_page.to_string();
        let resp = self
            .client
            .get(&self.api_url)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .query(&[
                ("query", query),
                ("per_page", per_page.as_str()),
                ("orientation", "landscape"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LoungeError::Api {
                message: format!("photo search '{}' failed: {} - {}", query, status, body),
            });
        }

        let parsed: SearchResponse = resp.json().await?;
        debug!("Photo search '{}' returned {} photos", query, parsed.photos.len());
        Ok(parsed.photos.into_iter().map(Photo::from).collect())
    }
}
