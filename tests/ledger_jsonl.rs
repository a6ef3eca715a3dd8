// tests/ledger_jsonl.rs
use chrono::{TimeZone, Utc};
use promo_radar::ingest::types::{FetchMethod, Item};
use promo_radar::ledger::{JsonlLedger, LedgerEntry, LedgerKey, LedgerStore};

fn entry(source: &str, link: &str) -> LedgerEntry {
    let item = Item {
        source: source.into(),
        title: format!("title for {link}"),
        summary: String::new(),
        link: link.into(),
        published_at: Some(Utc.with_ymd_and_hms(2025, 10, 12, 9, 0, 0).unwrap()),
        method: FetchMethod::Feed,
    };
    LedgerEntry::for_item(&item, Utc.with_ymd_and_hms(2025, 10, 13, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn append_is_idempotent_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("ledger.jsonl");

    let first = JsonlLedger::new(&path);
    assert_eq!(first.append(&[]).await.unwrap(), 0);
    assert!(!path.exists(), "empty append must not create the file");

    let batch = vec![entry("A", "https://a.com/1"), entry("A", "https://a.com/2")];
    assert_eq!(first.append(&batch).await.unwrap(), 2);

    // A fresh handle (next run) sees the same keys and skips them.
    let second = JsonlLedger::new(&path);
    assert_eq!(second.append(&batch).await.unwrap(), 0);
    assert_eq!(
        second
            .append(&[entry("A", "https://a.com/2"), entry("B", "https://a.com/2")])
            .await
            .unwrap(),
        1
    );

    let keys = second.load_keys().await.unwrap();
    assert_eq!(keys.len(), 3);
    assert!(keys.contains(&LedgerKey::new("B", "https://a.com/2")));

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.lines().count(), 3);
}

#[tokio::test]
async fn entries_keep_audit_fields() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = JsonlLedger::new(dir.path().join("ledger.jsonl"));
    ledger.append(&[entry("A", "https://a.com/1")]).await.unwrap();

    let back = ledger.read_entries().await.unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0], entry("A", "https://a.com/1"));

    let line = std::fs::read_to_string(ledger.path()).unwrap();
    assert!(line.contains("\"method\":\"FEED\""));
    assert!(line.contains("\"first_seen_at\":\"2025-10-13T12:00:00Z\""));
}

#[tokio::test]
async fn unreadable_ledger_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file should be.
    let ledger = JsonlLedger::new(dir.path());
    assert!(ledger.load_keys().await.is_err());
}
