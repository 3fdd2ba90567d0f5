use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{Reader, ReaderBuilder, StringRecord};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result};
use crate::models::{NewsItem, PriceBar};

/// Columns every price file must carry
pub const PRICE_COLUMNS: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

/// Loads per-ticker price files and news files from disk
#[derive(Debug, Clone)]
pub struct DataLoader {
    data_dir: PathBuf,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of a ticker's price file
    pub fn stock_path(&self, ticker: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", ticker))
    }

    /// Load and clean a single ticker's price file.
    ///
    /// Rows come back sorted by date with gaps forward-filled, then
    /// back-filled for leading gaps.
    pub fn load_stock(&self, ticker: &str) -> Result<Vec<PriceBar>> {
        let path = self.stock_path(ticker);
        let file_label = format!("{}.csv", ticker);
        let mut rdr = open_csv(&path)?;

        let headers = rdr.headers()?.clone();
        let positions = column_positions(&headers, &file_label)?;

        let mut rows: Vec<(NaiveDate, [Option<f64>; 5])> = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let date = parse_date(record.get(positions[0]).unwrap_or(""))?;

            let mut values = [None; 5];
            for (col, value) in values.iter_mut().enumerate() {
                let field = record.get(positions[col + 1]).unwrap_or("");
                *value = parse_number(field, row + 1, PRICE_COLUMNS[col + 1])?;
            }
            rows.push((date, values));
        }
        // Gaps are filled in date order
        rows.sort_by_key(|(date, _)| *date);

        let dates: Vec<NaiveDate> = rows.iter().map(|(date, _)| *date).collect();
        let columns: Vec<Vec<Option<f64>>> = (0..5)
            .map(|col| rows.iter().map(|(_, values)| values[col]).collect())
            .collect();

        let mut filled = Vec::with_capacity(columns.len());
        for (col, values) in columns.into_iter().enumerate() {
            let missing = values.iter().filter(|v| v.is_none()).count();
            if missing > 0 {
                debug!("{}: filling {} missing {} values", file_label, missing, PRICE_COLUMNS[col + 1]);
            }
            filled.push(fill_gaps(values).ok_or_else(|| AnalysisError::EmptyColumn {
                file: file_label.clone(),
                column: PRICE_COLUMNS[col + 1].to_string(),
            })?);
        }

        let bars: Vec<PriceBar> = dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| PriceBar {
                date,
                open: filled[0][i],
                high: filled[1][i],
                low: filled[2][i],
                close: filled[3][i],
                volume: filled[4][i],
            })
            .collect();

        debug!("Loaded {} bars for {} from {}", bars.len(), ticker, path.display());
        Ok(bars)
    }

    /// Load every listed ticker; the first failure aborts the whole load
    pub fn load_all_stocks(&self, tickers: &[String]) -> Result<BTreeMap<String, Vec<PriceBar>>> {
        info!("📊 Loading {} tickers from {}", tickers.len(), self.data_dir.display());

        let mut data = BTreeMap::new();
        for ticker in tickers {
            let bars = self.load_stock(ticker)?;
            data.insert(ticker.clone(), bars);
        }

        info!("✅ Loaded price history for {} tickers", data.len());
        Ok(data)
    }

    /// Load a news file with `headline` and `date` (or `timestamp`) columns.
    ///
    /// Optional `stock` (or `ticker`) and `sentiment` columns are picked up
    /// when present; every other column is ignored.
    pub fn load_news(&self, path: impl AsRef<Path>) -> Result<Vec<NewsItem>> {
        let path = path.as_ref();
        let mut rdr = open_csv(path)?;

        let headers = rdr.headers()?.clone();
        let has = |name: &str| headers.iter().any(|h| h == name);
        let mut missing = Vec::new();
        if !has("headline") {
            missing.push("headline".to_string());
        }
        if !has("date") && !has("timestamp") {
            missing.push("date".to_string());
        }
        if !missing.is_empty() {
            return Err(AnalysisError::MissingColumns {
                file: path.display().to_string(),
                missing,
            });
        }

        let mut items = Vec::new();
        for record in rdr.deserialize::<NewsRow>() {
            let row = record?;
            let mut item = NewsItem::new(parse_timestamp(&row.date)?, row.headline);
            if let Some(ticker) = row.stock.filter(|t| !t.is_empty()) {
                item = item.for_ticker(ticker);
            }
            if let Some(score) = row.sentiment {
                item = item.with_sentiment(score);
            }
            items.push(item);
        }

        info!("📰 Loaded {} news items from {}", items.len(), path.display());
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct NewsRow {
    headline: String,
    #[serde(alias = "timestamp")]
    date: String,
    #[serde(default, alias = "ticker")]
    stock: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    sentiment: Option<f64>,
}

fn open_csv(path: &Path) -> Result<Reader<File>> {
    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => AnalysisError::NotFound(path.to_path_buf()),
        _ => AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn column_positions(headers: &StringRecord, file: &str) -> Result<[usize; 6]> {
    let mut positions = [0usize; 6];
    let mut missing = Vec::new();

    for (slot, name) in PRICE_COLUMNS.iter().enumerate() {
        match headers.iter().position(|h| h == *name) {
            Some(pos) => positions[slot] = pos,
            None => missing.push(name.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(AnalysisError::MissingColumns {
            file: file.to_string(),
            missing,
        })
    }
}

fn parse_number(field: &str, row: usize, column: &str) -> Result<Option<f64>> {
    if field.is_empty() || field.eq_ignore_ascii_case("nan") || field.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    field
        .parse::<f64>()
        .map(Some)
        .map_err(|_| AnalysisError::InvalidNumber {
            row,
            column: column.to_string(),
            value: field.to_string(),
        })
}

/// Forward-fill then back-fill; `None` when a non-empty column holds no value at all
pub fn fill_gaps(values: Vec<Option<f64>>) -> Option<Vec<f64>> {
    if values.is_empty() {
        return Some(Vec::new());
    }
    let first = values.iter().flatten().next().copied()?;

    let mut last = first;
    let filled = values
        .into_iter()
        .map(|value| {
            if let Some(v) = value {
                last = v;
            }
            last
        })
        .collect();
    Some(filled)
}

/// Parse a calendar date, accepting date-time text as well
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_timestamp(text).map(|ts| ts.date())
}

/// Parse a news timestamp.
///
/// UTC offsets are dropped so the wall-clock time of publication is kept.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(ts) = DateTime::parse_from_str(text, format) {
            return Ok(ts.naive_local());
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts);
        }
    }

    warn!("Unparseable timestamp: {:?}", text);
    Err(AnalysisError::InvalidDate(text.to_string()))
}
