use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lounge_merge::app::image_use_case::ImageUseCase;
use lounge_merge::app::ports::{Photo, PhotoSearchPort, RecordSinkPort};
use lounge_merge::app::upload_use_case::UploadUseCase;
use lounge_merge::domain::LoungeRecord;
use lounge_merge::error::{LoungeError, Result};
use lounge_merge::pipeline::ingestion::{Limits, RateLimiter};
use serde_json::Value;

/// Answers only queries mentioning "Istanbul"; fails for "broken".
struct ScriptedPhotos {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl PhotoSearchPort for ScriptedPhotos {
    async fn search(&self, query: &str, per_page: usize) -> Result<Vec<Photo>> {
        self.calls.lock().unwrap().push(query.to_string());
        if query.contains("broken") {
            return Err(LoungeError::Api {
                message: "rate limited".into(),
            });
        }
        if !query.contains("Istanbul") {
            return Ok(Vec::new());
        }
        Ok((0..5)
            .take(per_page)
            .map(|i| Photo {
                url: format!("https://img.example/{}.jpg", i),
                photographer: Some("Ana".into()),
                photographer_url: None,
                source_page: None,
            })
            .collect())
    }
}

fn lounge(id: &str, name: &str, city: Option<&str>) -> LoungeRecord {
    let mut record = LoungeRecord::new(id, name, "test");
    record.city = city.map(str::to_string);
    record
}

#[tokio::test]
async fn test_images_search_then_fallback() {
    let search = Arc::new(ScriptedPhotos {
        calls: Mutex::new(Vec::new()),
    });
    let limiter = RateLimiter::new(Limits {
        requests_per_min: None,
        concurrency: Some(2),
    });
    let use_case = ImageUseCase::new(search.clone(), limiter);

    let mut records = vec![
        lounge("ist", "Sky Lounge", Some("Istanbul")),
        lounge("own", "Own Lounge", None),
        lounge("bad", "broken", None),
    ];
    records[1].images = vec!["mine.jpg".into()];
    let generic = vec!["g0.jpg".to_string(), "g1.jpg".to_string()];

    let (report, attributions) = use_case.run(&mut records, &generic).await;

    assert_eq!(report.candidates, 2);
    assert_eq!(report.with_photos, 1);
    assert_eq!(report.without_photos, 1);
    assert_eq!(report.generic_applied, 1);

    assert_eq!(records[0].images.len(), 3);
    assert_eq!(attributions.len(), 3);
    assert!(attributions.iter().all(|a| a.lounge_id == "ist"));
    assert_eq!(records[1].images, vec!["mine.jpg"]);
    // idx 2 starts at 6 mod 2 = 0
    assert_eq!(records[2].images, vec!["g0.jpg", "g1.jpg"]);

    let calls = search.calls.lock().unwrap();
    assert!(calls.iter().any(|q| q == "luxury airport lounge interior"));
    assert!(!calls.iter().any(|q| q.contains("Own Lounge")));
}

/// Rejects the second batch of every table.
struct FlakySink {
    calls: AtomicUsize,
    tables: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl RecordSinkPort for FlakySink {
    async fn upsert_batch(&self, table: &str, rows: &[Value]) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let nth_for_table = tables.iter().filter(|(t, _)| t == table).count();
        tables.push((table.to_string(), rows.len()));
        self.calls.fetch_add(1, Ordering::SeqCst);
        if nth_for_table == 1 {
            return Err(LoungeError::Api {
                message: "timeout".into(),
            });
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_upload_airports_first_and_continue_after_failure() {
    let sink = Arc::new(FlakySink {
        calls: AtomicUsize::new(0),
        tables: Mutex::new(Vec::new()),
    });
    let use_case = UploadUseCase::new(sink.clone(), 2);

    let records: Vec<LoungeRecord> = (0..5)
        .map(|i| {
            let mut r = LoungeRecord::new(format!("l{}", i), format!("Lounge {}", i), "test");
            r.airport_code = Some(if i < 3 { "IST".into() } else { "ATL".into() });
            r
        })
        .collect();

    let report = use_case.run(&records, "airports", "lounges").await;

    assert_eq!(report.airports.rows, 2);
    assert_eq!(report.airports.batches_ok, 1);
    assert_eq!(report.airports.batches_failed, 0);
    assert_eq!(report.lounges.rows, 5);
    assert_eq!(report.lounges.batches_ok, 2);
    assert_eq!(report.lounges.batches_failed, 1);
    assert_eq!(report.lounges.rows_sent, 3);
    assert_eq!(report.failed_batches(), 1);

    let tables = sink.tables.lock().unwrap();
    assert_eq!(tables[0], ("airports".to_string(), 2));
    let lounge_batches: Vec<usize> = tables
        .iter()
        .filter(|(t, _)| t == "lounges")
        .map(|(_, n)| *n)
        .collect();
    assert_eq!(lounge_batches, vec![2, 2, 1]);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 4);
}
