use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::app::ports::{Airport, ExtractScope, ExtractedLounge, LoungeSourcePort, SourceInfo};
use crate::constants::WIKIDATA_SOURCE_NAME;
use crate::domain::LoungeType;
use crate::error::{LoungeError, Result};

/// Items that are an airport lounge (Q1248784), with airport, operator,
/// location, coordinates and terminal where known.
const LOUNGE_QUERY: &str = r#"
SELECT DISTINCT ?lounge ?loungeLabel ?airport ?airportLabel ?iata
       ?operator ?operatorLabel ?location ?locationLabel ?coords
       ?terminal ?terminalLabel ?website
WHERE {
  ?lounge wdt:P31 wd:Q1248784.
  OPTIONAL { ?lounge wdt:P4969 ?airport. ?airport wdt:P238 ?iata. }
  OPTIONAL { ?lounge wdt:P137 ?operator. }
  OPTIONAL { ?lounge wdt:P131 ?location. }
  OPTIONAL { ?lounge wdt:P625 ?coords. }
  OPTIONAL { ?lounge wdt:P5389 ?terminal. }
  OPTIONAL { ?lounge wdt:P856 ?website. }
  SERVICE wikibase:label { bd:serviceParam wikibase:language "en". }
}
ORDER BY ?airportLabel
"#;

/// Airport and business lounges operated by an airline (Q46970).
const AIRLINE_LOUNGE_QUERY: &str = r#"
SELECT DISTINCT ?lounge ?loungeLabel ?airport ?airportLabel ?iata
       ?airline ?airlineLabel ?coords ?country ?countryLabel
WHERE {
  { ?lounge wdt:P31 wd:Q1248784. } UNION { ?lounge wdt:P31 wd:Q11997503. }
  OPTIONAL { ?lounge wdt:P137 ?airline. ?airline wdt:P31 wd:Q46970. }
  OPTIONAL { ?lounge wdt:P4969 ?airport. ?airport wdt:P238 ?iata. ?airport wdt:P17 ?country. }
  OPTIONAL { ?lounge wdt:P625 ?coords. }
  SERVICE wikibase:label { bd:serviceParam wikibase:language "en". }
}
LIMIT 1000
"#;

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<HashMap<String, Binding>>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    value: String,
}

fn value(row: &HashMap<String, Binding>, key: &str) -> Option<String> {
    row.get(key)
        .map(|b| b.value.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `Point(lng lat)` into `(lat, lng)`.
fn parse_point(wkt: &str) -> Option<(f64, f64)> {
    let inner = wkt.trim().strip_prefix("Point(")?.strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let lng = parts.next()?.parse::<f64>().ok()?;
    let lat = parts.next()?.parse::<f64>().ok()?;
    Some((lat, lng))
}

/// Rows without an item id or an English label are skipped. The label
/// service falls back to the bare `Q` id when no label exists.
fn parse_row(row: &HashMap<String, Binding>) -> Option<ExtractedLounge> {
    let uri = value(row, "lounge")?;
    let qid = uri.rsplit('/').next().filter(|id| !id.is_empty())?.to_string();
    let name = value(row, "loungeLabel").filter(|label| *label != qid)?;

    let (latitude, longitude) = match value(row, "coords").as_deref().and_then(parse_point) {
        Some((lat, lng)) => (Some(lat), Some(lng)),
        None => (None, None),
    };
    let airline = value(row, "airlineLabel");
    let operator = value(row, "operatorLabel").or_else(|| airline.clone());
    let lounge_type = match &airline {
        Some(_) => LoungeType::Airline,
        None => LoungeType::infer(operator.as_deref().unwrap_or(&name)),
    };

    Some(ExtractedLounge {
        id: format!("wikidata_{}", qid),
        source: WIKIDATA_SOURCE_NAME.to_string(),
        airport_code: value(row, "iata").map(|c| c.to_uppercase()),
        airport_name: value(row, "airportLabel"),
        city: value(row, "locationLabel"),
        country: value(row, "countryLabel"),
        terminal: value(row, "terminalLabel"),
        latitude,
        longitude,
        lounge_type: Some(lounge_type.as_str().to_string()),
        website: value(row, "website"),
        wikidata_id: Some(qid),
        verification_source: Some("wikidata".to_string()),
        operator,
        name,
        ..Default::default()
    })
}

/// Lounge items from a Wikidata SPARQL endpoint.
pub struct WikidataClient {
    client: reqwest::Client,
    endpoint: String,
    info: SourceInfo,
}

impl WikidataClient {
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            info: SourceInfo {
                name: WIKIDATA_SOURCE_NAME.to_string(),
                license: "CC0 (Public Domain)".to_string(),
                attribution: "Wikidata contributors (wikidata.org)".to_string(),
            },
        })
    }

    async fn run_query(&self, query: &str) -> Result<Vec<ExtractedLounge>> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .query(&[("query", query), ("format", "json")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LoungeError::Api {
                message: format!("SPARQL query failed: {} - {}", status, body),
            });
        }

        let body: SparqlResponse = resp.json().await?;
        debug!("SPARQL returned {} bindings", body.results.bindings.len());
        Ok(body.results.bindings.iter().filter_map(parse_row).collect())
    }
}

#[async_trait]
impl LoungeSourcePort for WikidataClient {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn scope(&self) -> ExtractScope {
        ExtractScope::Worldwide
    }

    /// Both queries run; one failing still returns the other's rows.
    async fn fetch(&self, _airport: Option<&Airport>) -> Result<Vec<ExtractedLounge>> {
        let mut lounges = Vec::new();
        let mut last_error = None;
        let mut answered = 0;
        for query in [LOUNGE_QUERY, AIRLINE_LOUNGE_QUERY] {
            match self.run_query(query).await {
                Ok(rows) => {
                    answered += 1;
                    lounges.extend(rows);
                }
                Err(e) => {
                    warn!("Wikidata query failed: {}", e);
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if answered == 0 => Err(e),
            _ => Ok(lounges),
        }
    }
}
