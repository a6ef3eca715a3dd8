// tests/metrics_pipeline.rs
// Own test binary: the Prometheus recorder is process-global.
use chrono::{TimeZone, Utc};
use promo_radar::ingest::providers::FeedAdapter;
use promo_radar::ingest::types::SourceAdapter;
use promo_radar::ledger::MemoryLedger;
use promo_radar::metrics::Metrics;
use promo_radar::notify::{MemorySink, SinkSet};
use promo_radar::pipeline::Pipeline;
use promo_radar::recency::{RecencyWindow, UndatedPolicy};
use promo_radar::relevance::{FilterEngine, RuleSet};

const RSS_XML: &str = include_str!("fixtures/rss_promos.xml");

#[tokio::test]
async fn metrics_exposed_after_run() {
    let metrics = Metrics::init().expect("recorder");

    let adapters: Vec<Box<dyn SourceAdapter>> =
        vec![Box::new(FeedAdapter::from_fixture("Blog RSS", RSS_XML))];
    let p = Pipeline::new(
        adapters,
        FilterEngine::new(&RuleSet::transfer_bonus()).unwrap(),
        RecencyWindow::new(3, UndatedPolicy::Accept),
        Box::new(MemoryLedger::new()),
        SinkSet::new().with_sink(Box::new(MemorySink::new("m"))),
    );
    let report = p
        .run(Utc.with_ymd_and_hms(2025, 10, 13, 12, 0, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(report.committed, 3);

    let out = metrics.render();
    assert!(out.contains("radar_candidates_total 7"));
    assert!(out.contains("radar_kept_total 3"));
    assert!(out.contains("radar_ledger_committed_total 3"));
    assert!(out.contains(r#"radar_dropped_total{stage="window"} 1"#));
    assert!(out.contains("radar_fetch_ms"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("radar.prom");
    metrics.write_textfile(&path).unwrap();
    assert!(std::fs::read_to_string(&path)
        .unwrap()
        .contains("radar_kept_total"));
}
