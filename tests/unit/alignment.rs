use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use test_log::test;

use rust_stocks_sentiment::{FallbackPolicy, NewsItem, TradingDayIndex};

use crate::common::test_data;

fn index_over(days: usize) -> TradingDayIndex {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    TradingDayIndex::build(test_data::business_days(start, days)).unwrap()
}

#[test]
fn test_aligned_day_is_never_before_publication() {
    let index = index_over(30);
    let start = NaiveDate::from_ymd_opt(2024, 2, 20).unwrap().and_hms_opt(0, 0, 0).unwrap();

    // Every six hours across the index and a little beyond it
    for step in 0..200 {
        let ts = start + Duration::hours(6 * step);
        match index.align_strict(ts) {
            Some(day) => {
                assert!(day >= ts.date(), "{} aligned back to {}", ts, day);
                assert!(index.contains(day));
                // Nothing in the index sits between the publication date and the match
                assert!(index.days().iter().all(|d| *d < ts.date() || *d >= day));
            }
            None => {
                assert!(ts.date() > index.last());
                assert_eq!(index.align(ts), index.last());
            }
        }
    }
}

#[test]
fn test_aligning_a_trading_day_is_stable() {
    let index = index_over(20);
    for &day in index.days() {
        let once = index.align(day.and_hms_opt(14, 0, 0).unwrap());
        assert_eq!(once, day);
        assert_eq!(index.align(once.and_hms_opt(0, 0, 0).unwrap()), once);
    }
}

#[test]
fn test_weekend_news_moves_to_monday() {
    let index = index_over(10);
    let saturday = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap().and_hms_opt(15, 0, 0).unwrap();
    let sunday = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap().and_hms_opt(8, 0, 0).unwrap();
    let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

    assert_eq!(index.align(saturday), monday);
    assert_eq!(index.align(sunday), monday);
}

#[test]
fn test_policy_controls_news_after_last_day() {
    let index = index_over(5);
    let late = (index.last() + Duration::days(10)).and_hms_opt(9, 0, 0).unwrap();
    let early = index.first().and_hms_opt(9, 0, 0).unwrap();
    let news = vec![
        NewsItem::new(early, "inside"),
        NewsItem::new(late, "after the data ends"),
    ];

    let kept = index.align_news_with_policy(&news, FallbackPolicy::LastTradingDay);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[1].trading_day, index.last());
    assert_eq!(kept[1].item.headline, "after the data ends");

    let excluded = index.align_news_with_policy(&news, FallbackPolicy::Exclude);
    assert_eq!(excluded.len(), 1);
    assert_eq!(excluded[0].item.headline, "inside");
}

#[test]
fn test_alignment_preserves_items() {
    let index = index_over(5);
    let ts = index.first().and_hms_opt(12, 0, 0).unwrap();
    let item = NewsItem::new(ts, "Chipmaker beats estimates")
        .for_ticker("NVDA")
        .with_sentiment(0.6);

    let aligned = index.align_news(std::slice::from_ref(&item));
    assert_eq!(aligned[0].item, item);
    assert_eq!(aligned[0].trading_day, index.first());
}
