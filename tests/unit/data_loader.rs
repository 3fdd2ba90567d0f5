use assert_matches::assert_matches;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use test_log::test;

use rust_stocks_sentiment::{AnalysisError, DataLoader};

use crate::common::TestDataDir;

#[test]
fn test_gaps_are_forward_then_back_filled() {
    let dir = TestDataDir::new();
    dir.write_file(
        "AAPL.csv",
        "Date,Open,High,Low,Close,Adj Close,Volume\n\
         2024-01-04,,,,,,\n\
         2024-01-02,10,11,9,10.5,10.4,1000\n\
         2024-01-03,10.6,,10,,10.9,\n\
         2024-01-05,11,12,10.5,11.5,11.4,1500\n",
    );

    let bars = DataLoader::new(dir.path()).load_stock("AAPL").unwrap();
    let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        ]
    );
    // 01-04 comes first in the file but is filled from 01-03 after sorting
    assert_eq!(closes, vec![10.5, 10.5, 10.5, 11.5]);
    assert_eq!(volumes, vec![1000.0, 1000.0, 1000.0, 1500.0]);
}

#[test]
fn test_leading_gap_is_back_filled() {
    let dir = TestDataDir::new();
    dir.write_file(
        "GOOG.csv",
        "Date,Open,High,Low,Close,Volume\n\
         2024-01-03,5,6,4,5.5,200\n\
         2024-01-02,NaN,NaN,NaN,NaN,NaN\n",
    );

    let bars = DataLoader::new(dir.path()).load_stock("GOOG").unwrap();
    assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(bars[0].close, 5.5);
    assert_eq!(bars[0].volume, 200.0);
}

#[test]
fn test_missing_columns_are_named() {
    let dir = TestDataDir::new();
    dir.write_file("MSFT.csv", "Date,Open,Close\n2024-01-02,1,2\n");

    let err = DataLoader::new(dir.path()).load_stock("MSFT").unwrap_err();
    assert_matches!(&err, AnalysisError::MissingColumns { missing, .. } if missing == &["High", "Low", "Volume"]);
    assert!(err.to_string().contains("High"));
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = TestDataDir::new();
    assert_matches!(
        DataLoader::new(dir.path()).load_stock("NOPE"),
        Err(AnalysisError::NotFound(path)) if path.ends_with("NOPE.csv")
    );
}

#[test]
fn test_load_all_stocks_fails_fast() {
    let dir = TestDataDir::new();
    dir.write_file("AAPL.csv", "Date,Open,High,Low,Close,Volume\n2024-01-02,1,1,1,1,1\n");
    let loader = DataLoader::new(dir.path());

    let ok = loader.load_all_stocks(&["AAPL".to_string()]).unwrap();
    assert_eq!(ok.len(), 1);

    let tickers = vec!["AAPL".to_string(), "GOOG".to_string()];
    assert_matches!(loader.load_all_stocks(&tickers), Err(AnalysisError::NotFound(_)));
}

#[test]
fn test_news_file_columns() {
    let dir = TestDataDir::new();
    let path = dir.write_file(
        "news.csv",
        "headline,url,publisher,date,stock\n\
         Stocks That Hit 52-Week Highs,https://x,Benzinga,2020-06-05 10:30:54-04:00,A\n\
         Apple unveils new iPhone,https://y,Reuters,2020-06-06 08:00:00,\n",
    );

    let news = DataLoader::new(dir.path()).load_news(&path).unwrap();
    assert_eq!(news.len(), 2);
    assert_eq!(news[0].ticker.as_deref(), Some("A"));
    assert_eq!(news[1].ticker, None);
    assert_eq!(
        news[0].timestamp,
        NaiveDate::from_ymd_opt(2020, 6, 5).unwrap().and_hms_opt(10, 30, 54).unwrap()
    );
    assert!(news.iter().all(|n| n.sentiment.is_none()));
}

#[test]
fn test_news_file_without_headline() {
    let dir = TestDataDir::new();
    let path = dir.write_file("news.csv", "title,date\nHello,2024-01-02\n");

    assert_matches!(
        DataLoader::new(dir.path()).load_news(&path),
        Err(AnalysisError::MissingColumns { missing, .. }) if missing == vec!["headline".to_string()]
    );
}
