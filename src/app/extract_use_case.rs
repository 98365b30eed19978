use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::app::ports::{Airport, ExtractScope, ExtractedLounge, LoungeSourcePort};
use crate::constants::FALLBACK_AIRPORTS;
use crate::observability::metrics;
use crate::pipeline::ingestion::RateLimiter;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub requests: usize,
    pub failed_requests: usize,
    /// Rows dropped because an earlier row had the same id
    pub duplicates: usize,
    pub lounges: usize,
}

/// Airports queried by per-airport sources when no table is configured.
pub fn fallback_airports() -> Vec<Airport> {
    FALLBACK_AIRPORTS
        .iter()
        .map(|(code, name, lat, lng)| Airport {
            iata_code: code.to_string(),
            name: name.to_string(),
            latitude: *lat,
            longitude: *lng,
            elevation_ft: None,
            municipality: None,
            iso_country: None,
            continent: None,
            wikipedia: None,
        })
        .collect()
}

/// Pulls lounge rows out of one dataset.
pub struct ExtractUseCase {
    source: Arc<dyn LoungeSourcePort>,
    limiter: RateLimiter,
}

impl ExtractUseCase {
    pub fn new(source: Arc<dyn LoungeSourcePort>, limiter: RateLimiter) -> Self {
        Self { source, limiter }
    }

    /// One rate-limited request. A failure is logged and yields no rows.
    async fn fetch_one(
        source: Arc<dyn LoungeSourcePort>,
        limiter: RateLimiter,
        airport: Option<Airport>,
    ) -> Option<Vec<ExtractedLounge>> {
        let _permit = limiter.acquire().await;
        let target = airport.as_ref().map_or("worldwide", |a| a.iata_code.as_str());
        match source.fetch(airport.as_ref()).await {
            Ok(lounges) => {
                info!("{}: {} lounges from {}", target, lounges.len(), source.info().name);
                metrics::extract::request_success(lounges.len());
                Some(lounges)
            }
            Err(e) => {
                warn!("{}: {} request failed: {}", target, source.info().name, e);
                metrics::extract::request_error();
                None
            }
        }
    }

    /// Query the source once, or once per airport, and return the rows with
    /// duplicate ids removed. Per-airport results keep the airport order.
    pub async fn run(&self, airports: &[Airport]) -> (ExtractReport, Vec<ExtractedLounge>) {
        let mut report = ExtractReport::default();
        let batches: Vec<Option<Vec<ExtractedLounge>>> = match self.source.scope() {
            ExtractScope::Worldwide => {
                report.requests = 1;
                vec![Self::fetch_one(Arc::clone(&self.source), self.limiter.clone(), None).await]
            }
            ExtractScope::PerAirport => {
                report.requests = airports.len();
                info!("Querying {} airports from {}", airports.len(), self.source.info().name);
                let mut tasks = JoinSet::new();
                for (idx, airport) in airports.iter().enumerate() {
                    let source = Arc::clone(&self.source);
                    let limiter = self.limiter.clone();
                    let airport = airport.clone();
                    tasks.spawn(async move { (idx, Self::fetch_one(source, limiter, Some(airport)).await) });
                }

                let mut batches = vec![None; airports.len()];
                while let Some(joined) = tasks.join_next().await {
                    match joined {
                        Ok((idx, batch)) => batches[idx] = batch,
                        Err(e) => error!("Extraction task failed: {}", e),
                    }
                }
                batches
            }
        };

        let mut seen = HashSet::new();
        let mut lounges = Vec::new();
        for batch in batches {
            let Some(batch) = batch else {
                report.failed_requests += 1;
                continue;
            };
            for lounge in batch {
                if seen.insert(lounge.id.clone()) {
                    lounges.push(lounge);
                } else {
                    report.duplicates += 1;
                }
            }
        }
        report.lounges = lounges.len();
        (report, lounges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_airports_have_codes_and_positions() {
        let airports = fallback_airports();
        assert_eq!(airports.len(), FALLBACK_AIRPORTS.len());
        assert_eq!(airports[0].iata_code, "IST");
        assert!(airports.iter().all(|a| a.iata_code.len() == 3 && a.latitude != 0.0));
    }
}
