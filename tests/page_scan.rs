// tests/page_scan.rs
use promo_radar::ingest::normalize_batch;
use promo_radar::ingest::providers::PageScanAdapter;
use promo_radar::ingest::types::{FetchMethod, SourceAdapter};
use promo_radar::relevance::{FilterEngine, RuleSet};
use url::Url;

const PAGE_HTML: &str = include_str!("fixtures/page_promos.html");

#[tokio::test]
async fn page_anchors_resolve_against_page_url() {
    let page = Url::parse("https://www.smiles.example.com/promocoes").unwrap();
    let adapter = PageScanAdapter::from_fixture("Smiles Page", page, PAGE_HTML);
    let raws = adapter.fetch().await.unwrap();
    assert_eq!(raws.len(), 6, "script bodies never yield anchors");

    let (items, dropped) = normalize_batch(&adapter.context(), raws);
    // #fragment, javascript: and mailto: links
    assert_eq!(dropped, 3);

    let links: Vec<_> = items.iter().map(|i| i.link.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "https://www.smiles.example.com/login",
            "https://www.smiles.example.com/promocoes/bonus-transferencia-100",
            "https://www.partner.example.net/clube",
        ]
    );
    assert_eq!(items[1].title, "Ganhe até 100% de bônus na transferência de pontos");
    assert_eq!(items[2].title, "Clube com bônus mensal");
    assert_eq!(items[0].summary, "login");
    assert_eq!(items[1].summary, "promocoes bonus transferencia 100");
    assert_eq!(items[2].summary, "clube");
    assert!(items
        .iter()
        .all(|i| i.published_at.is_none() && i.method == FetchMethod::Scrape));
}

#[tokio::test]
async fn explicit_base_url_wins() {
    let page = Url::parse("https://www.smiles.example.com/promocoes").unwrap();
    let adapter = PageScanAdapter::from_fixture("Smiles Page", page, PAGE_HTML)
        .with_base_url(Url::parse("https://cdn.example.com/").unwrap());
    let (items, _) = normalize_batch(&adapter.context(), adapter.fetch().await.unwrap());
    assert_eq!(items[0].link, "https://cdn.example.com/login");
}

#[tokio::test]
async fn generic_anchor_text_matches_on_href_path() {
    let page = Url::parse("https://www.smiles.example.com/").unwrap();
    let html = r#"<html><body>
        <a href="/promocoes/bonus-transferencia">Saiba mais</a>
        <a href="/sobre-nos">Saiba mais</a>
    </body></html>"#;
    let adapter = PageScanAdapter::from_fixture("Smiles Page", page, html);
    let (items, _) = normalize_batch(&adapter.context(), adapter.fetch().await.unwrap());
    assert_eq!(items.len(), 2);

    let engine = FilterEngine::new(&RuleSet::transfer_bonus()).unwrap();
    let kept: Vec<_> = items
        .iter()
        .filter(|i| engine.is_relevant(i))
        .map(|i| i.link.as_str())
        .collect();
    assert_eq!(
        kept,
        vec!["https://www.smiles.example.com/promocoes/bonus-transferencia"]
    );
}
