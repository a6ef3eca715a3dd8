// tests/providers_feed.rs
use chrono::{TimeZone, Utc};
use promo_radar::ingest::normalize_batch;
use promo_radar::ingest::providers::FeedAdapter;
use promo_radar::ingest::types::SourceAdapter;

const RSS_XML: &str = include_str!("fixtures/rss_promos.xml");
const ATOM_XML: &str = include_str!("fixtures/atom_promos.xml");

#[tokio::test]
async fn rss_fixture_parses_and_normalizes() {
    let adapter = FeedAdapter::from_fixture("Blog RSS", RSS_XML);
    let raws = adapter.fetch().await.expect("rss parse ok");
    assert_eq!(raws.len(), 7, "every <item> becomes a candidate");

    let (items, dropped) = normalize_batch(&adapter.context(), raws);
    assert_eq!(dropped, 1, "the untitled item is dropped");
    assert_eq!(items.len(), 6);

    let first = &items[0];
    assert_eq!(first.source, "Blog RSS");
    assert_eq!(first.title, "Livelo: bônus de 80% na transferência para Smiles");
    assert_eq!(first.summary, "Campanha válida até 15/10 .");
    assert_eq!(
        first.published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 12, 13, 0, 0).unwrap())
    );

    let undated = items
        .iter()
        .find(|i| i.link.ends_with("/tudoazul-100"))
        .expect("undated item kept");
    assert!(undated.published_at.is_none());
}

#[tokio::test]
async fn atom_fixture_prefers_alternate_links() {
    let adapter = FeedAdapter::from_fixture("Atom Blog", ATOM_XML);
    let raws = adapter.fetch().await.expect("atom parse ok");
    let (items, dropped) = normalize_batch(&adapter.context(), raws);
    assert_eq!(dropped, 0);
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].link, "https://atom.example.org/smiles-90");
    assert_eq!(items[0].summary, "Transferência a partir do Itaú");
    assert_eq!(
        items[0].published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 13, 9, 0, 0).unwrap())
    );

    // No <published>: falls back to <updated>; <content> stands in for <summary>.
    assert_eq!(items[1].link, "https://atom.example.org/sala-vip");
    assert_eq!(items[1].summary, "Fotos e impressões.");
    assert_eq!(
        items[1].published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 12, 18, 30, 0).unwrap())
    );
}

#[tokio::test]
async fn unreachable_feed_is_an_error_not_a_panic() {
    let url = url::Url::parse("http://127.0.0.1:9/feed").unwrap();
    let adapter = FeedAdapter::from_url(
        "Dead",
        url,
        "PromoRadar-test",
        std::time::Duration::from_millis(300),
    )
    .unwrap();
    assert!(adapter.fetch().await.is_err());
}

#[tokio::test]
async fn wordpress_namespaced_tags_do_not_sink_the_feed() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
  xmlns:atom="http://www.w3.org/2005/Atom"
  xmlns:media="http://search.yahoo.com/mrss/"
  xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Passageiro de Primeira</title>
    <atom:link href="https://wp.example.com/feed/" rel="self" type="application/rss+xml"/>
    <item>
      <title>Esfera: 100% de bônus para a Smiles</title>
      <link>https://wp.example.com/esfera-100</link>
      <atom:link href="https://wp.example.com/esfera-100/amp" rel="amphtml"/>
      <pubDate>Mon, 13 Oct 2025 08:00:00 +0000</pubDate>
      <description>Campanha relâmpago</description>
      <content:encoded><![CDATA[<p>Texto completo</p>]]></content:encoded>
      <media:title>Imagem de capa</media:title>
      <media:description>Legenda da imagem</media:description>
    </item>
    <item>
      <title>Livelo com bônus</title>
      <link>https://wp.example.com/livelo</link>
    </item>
  </channel>
</rss>"#;
    let adapter = FeedAdapter::from_fixture("WP Blog", xml);
    let raws = adapter.fetch().await.expect("namespaced rss parses");
    let (items, dropped) = normalize_batch(&adapter.context(), raws);
    assert_eq!(dropped, 0);
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].title, "Esfera: 100% de bônus para a Smiles");
    assert_eq!(items[0].link, "https://wp.example.com/esfera-100");
    assert_eq!(items[0].summary, "Campanha relâmpago");
    assert_eq!(
        items[0].published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 13, 8, 0, 0).unwrap())
    );
    assert_eq!(items[1].link, "https://wp.example.com/livelo");
}
