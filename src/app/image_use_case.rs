use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::app::ports::{Photo, PhotoSearchPort};
use crate::constants::{MAX_IMAGES_PER_LOUNGE, PHOTO_QUERY_TEMPLATES};
use crate::domain::LoungeRecord;
use crate::observability::metrics::{emit_counter, MetricName};
use crate::pipeline::ingestion::RateLimiter;

/// Credit line for one photo placed on a lounge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoAttribution {
    pub lounge_id: String,
    pub lounge_name: String,
    pub query: String,
    pub url: String,
    pub photographer: Option<String>,
    pub photographer_url: Option<String>,
    pub source_page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageReport {
    /// Lounges that had no images when the run started
    pub candidates: usize,
    pub with_photos: usize,
    pub without_photos: usize,
    pub generic_applied: usize,
}

/// Search queries for a record, in the order they are tried. Templates
/// whose placeholders the record cannot fill are skipped.
pub fn photo_queries(record: &LoungeRecord) -> Vec<String> {
    let airport = record
        .airport_name
        .clone()
        .or_else(|| record.airport_code.clone())
        .unwrap_or_default();
    let city = record.city.clone().unwrap_or_default();

    PHOTO_QUERY_TEMPLATES
        .iter()
        .filter(|t| !(t.contains("{city}") && city.is_empty()))
        .filter(|t| !(t.contains("{name}") && record.name.trim().is_empty()))
        .map(|t| {
            t.replace("{name}", record.name.trim())
                .replace("{airport}", &airport)
                .replace("{city}", &city)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Rotate a fixed image list onto records that still have no images.
/// Record `idx` starts at `idx * 3 mod n`.
pub fn apply_generic_images(records: &mut [LoungeRecord], generic: &[String]) -> usize {
    if generic.is_empty() {
        return 0;
    }
    let n = generic.len();
    let per_lounge = MAX_IMAGES_PER_LOUNGE.min(n);
    let mut applied = 0;
    for (idx, record) in records.iter_mut().enumerate() {
        if !record.images.is_empty() {
            continue;
        }
        let start = (idx * MAX_IMAGES_PER_LOUNGE) % n;
        record.images = (0..per_lounge).map(|i| generic[(start + i) % n].clone()).collect();
        applied += 1;
    }
    emit_counter(MetricName::ImagesGenericApplied, applied as u64);
    applied
}

pub fn write_attributions(path: &Path, attributions: &[PhotoAttribution]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(attributions)?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Finds photos for lounges that have none.
pub struct ImageUseCase {
    search: Arc<dyn PhotoSearchPort>,
    limiter: RateLimiter,
}

impl ImageUseCase {
    pub fn new(search: Arc<dyn PhotoSearchPort>, limiter: RateLimiter) -> Self {
        Self { search, limiter }
    }

    /// First query that yields photos wins. A failed search counts as an
    /// empty result.
    async fn find_photos(
        search: Arc<dyn PhotoSearchPort>,
        limiter: RateLimiter,
        queries: Vec<String>,
    ) -> Option<(String, Vec<Photo>)> {
        for query in queries {
            let _permit = limiter.acquire().await;
            emit_counter(MetricName::ImagesSearchRequests, 1);
            match search.search(&query, MAX_IMAGES_PER_LOUNGE).await {
                Ok(photos) if !photos.is_empty() => {
                    let photos = photos.into_iter().take(MAX_IMAGES_PER_LOUNGE).collect();
                    return Some((query, photos));
                }
                Ok(_) => debug!("No photos for '{}'", query),
                Err(e) => {
                    warn!("Photo search '{}' failed: {}", query, e);
                    emit_counter(MetricName::ImagesSearchFailures, 1);
                }
            }
        }
        None
    }

    /// Search photos for every record without images and attach the URLs.
    pub async fn fetch_photos(&self, records: &mut [LoungeRecord]) -> (ImageReport, Vec<PhotoAttribution>) {
        let mut report = ImageReport::default();
        let mut tasks = JoinSet::new();

        for (idx, record) in records.iter().enumerate() {
            if !record.images.is_empty() {
                continue;
            }
            report.candidates += 1;
            let queries = photo_queries(record);
            let search = Arc::clone(&self.search);
            let limiter = self.limiter.clone();
            tasks.spawn(async move { (idx, Self::find_photos(search, limiter, queries).await) });
        }

        info!("Searching photos for {} lounges", report.candidates);
        let mut attributions = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (idx, found) = match joined {
                Ok(result) => result,
                Err(e) => {
                    error!("Photo search task failed: {}", e);
                    report.without_photos += 1;
                    continue;
                }
            };
            let Some((query, photos)) = found else {
                report.without_photos += 1;
                continue;
            };

            let record = &mut records[idx];
            record.images = photos.iter().map(|p| p.url.clone()).collect();
            attributions.extend(photos.into_iter().map(|photo| PhotoAttribution {
                lounge_id: record.id.clone(),
                lounge_name: record.name.clone(),
                query: query.clone(),
                url: photo.url,
                photographer: photo.photographer,
                photographer_url: photo.photographer_url,
                source_page: photo.source_page,
            }));
            report.with_photos += 1;
        }

        attributions.sort_by(|a, b| a.lounge_id.cmp(&b.lounge_id));
        info!(
            "Photos found for {} lounges, {} without",
            report.with_photos, report.without_photos
        );
        (report, attributions)
    }

    /// Photo search followed by the generic fallback.
    pub async fn run(
        &self,
        records: &mut [LoungeRecord],
        generic_images: &[String],
    ) -> (ImageReport, Vec<PhotoAttribution>) {
        let (mut report, attributions) = self.fetch_photos(records).await;
        report.generic_applied = apply_generic_images(records, generic_images);
        if report.generic_applied > 0 {
            info!("Applied generic images to {} lounges", report.generic_applied);
        }
        (report, attributions)
    }
}
