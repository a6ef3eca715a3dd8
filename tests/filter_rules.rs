// tests/filter_rules.rs
use chrono::{Duration, TimeZone, Utc};
use promo_radar::ingest::types::{FetchMethod, Item};
use promo_radar::recency::{RecencyWindow, UndatedPolicy};
use promo_radar::relevance::{FilterEngine, RuleSet, Verdict};

fn item(title: &str, link: &str) -> Item {
    Item {
        source: "A".into(),
        title: title.into(),
        summary: String::new(),
        link: link.into(),
        published_at: None,
        method: FetchMethod::Feed,
    }
}

#[test]
fn positive_pattern_picks_the_bonus_post() {
    let engine = FilterEngine::new(&RuleSet {
        patterns: vec!["bônus|bonus".into()],
        ..RuleSet::default()
    })
    .unwrap();
    let now = Utc.with_ymd_and_hms(2025, 10, 13, 12, 0, 0).unwrap();
    let window = RecencyWindow::new(3, UndatedPolicy::Reject);

    let mut a = item("Banco X bônus de transferência 50%", "https://a.com/1");
    let mut b = item("unrelated news", "https://b.com/2");
    a.published_at = Some(now - Duration::days(1));
    b.published_at = Some(now - Duration::days(1));

    let kept: Vec<_> = [a, b]
        .into_iter()
        .filter(|i| engine.is_relevant(i) && window.contains(i, now))
        .collect();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].link, "https://a.com/1");
}

#[test]
fn domain_exclusion_is_host_scoped() {
    let engine = FilterEngine::new(&RuleSet {
        keywords: vec!["bonus".into()],
        excluded_domains: vec!["excluded.com".into(), "ads.example.com".into()],
        ..RuleSet::default()
    })
    .unwrap();

    // Sibling subdomain of an excluded host is fine.
    assert_eq!(
        engine.evaluate(&item("bonus", "https://blog.example.com/p")),
        Verdict::Accept
    );
    assert_eq!(
        engine.evaluate(&item("bonus", "https://x.ads.example.com/p")),
        Verdict::ExcludedDomain
    );
    // Excluded even with no keyword at all.
    assert_eq!(
        engine.evaluate(&item("plain", "https://excluded.com/p")),
        Verdict::ExcludedDomain
    );
    // Text mentioning the domain does not count.
    assert_eq!(
        engine.evaluate(&item("bonus on excluded.com", "https://ok.net/p")),
        Verdict::Accept
    );
}

#[test]
fn rules_from_toml_are_case_insensitive_for_keywords() {
    let rules = RuleSet::from_toml_str(
        r#"
keywords = ["Transferência"]
negative_keywords = ["encerrada"]
"#,
    )
    .unwrap();
    let engine = FilterEngine::new(&rules).unwrap();
    assert!(engine.is_relevant(&item("TRANSFERÊNCIA bonificada", "https://a.com/1")));
    assert_eq!(
        engine.evaluate(&item("Transferência ENCERRADA", "https://a.com/2")),
        Verdict::NegativeMatch
    );
    assert_eq!(
        engine.first_positive_hit("Promo de transferência"),
        Some("transferência")
    );
}
