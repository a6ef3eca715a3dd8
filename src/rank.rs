// src/rank.rs
//! Deterministic digest order.

use std::cmp::Ordering;

use crate::ingest::types::Item;

/// Dated before undated, newest first, then source, title and link ascending.
pub fn compare(a: &Item, b: &Item) -> Ordering {
    let by_date = match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.link.cmp(&b.link))
}

pub fn rank(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by(compare);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::FetchMethod;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn undated_sink_to_the_bottom_in_name_order() {
        let now = Utc.with_ymd_and_hms(2025, 10, 13, 12, 0, 0).unwrap();
        let mk = |source: &str, title: &str, age: Option<i64>| Item {
            source: source.into(),
            title: title.into(),
            summary: String::new(),
            link: format!("https://{}.com/{}", source.to_lowercase(), title),
            published_at: age.map(|h| now - Duration::hours(h)),
            method: FetchMethod::Feed,
        };
        let out = rank(vec![
            mk("B", "u", None),
            mk("A", "old", Some(30)),
            mk("A", "u", None),
            mk("B", "new", Some(1)),
            mk("A", "new", Some(1)),
        ]);
        let order: Vec<_> = out.iter().map(|i| format!("{}:{}", i.source, i.title)).collect();
        assert_eq!(order, vec!["A:new", "B:new", "A:old", "A:u", "B:u"]);
    }
}
