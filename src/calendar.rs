use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::models::{AlignedNewsItem, NewsItem, PriceBar, TradingDay};

/// What to do with news published after the last known trading day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Attribute the item to the latest trading day in the index.
    #[default]
    LastTradingDay,
    /// Leave the item out of the aligned batch.
    Exclude,
}

impl FromStr for FallbackPolicy {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "last_trading_day" | "last" => Ok(FallbackPolicy::LastTradingDay),
            "exclude" => Ok(FallbackPolicy::Exclude),
            other => Err(AnalysisError::Config(format!(
                "unknown unmapped news policy {:?} (expected last_trading_day or exclude)",
                other
            ))),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::LastTradingDay => write!(f, "last_trading_day"),
            FallbackPolicy::Exclude => write!(f, "exclude"),
        }
    }
}

/// Sorted, duplicate-free set of days with market activity.
///
/// Never empty: construction fails with [`AnalysisError::EmptyIndex`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingDayIndex {
    days: Vec<TradingDay>,
}

impl TradingDayIndex {
    /// Build the index from dates in any order, duplicates allowed
    pub fn build<I>(dates: I) -> Result<Self>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let days: Vec<TradingDay> = dates
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if days.is_empty() {
            return Err(AnalysisError::EmptyIndex);
        }

        debug!(
            "Built trading-day index: {} days from {} to {}",
            days.len(),
            days[0],
            days[days.len() - 1]
        );
        Ok(Self { days })
    }

    /// Build the index from the dates of a price series
    pub fn from_prices(bars: &[PriceBar]) -> Result<Self> {
        Self::build(bars.iter().map(|bar| bar.date))
    }

    pub fn days(&self) -> &[TradingDay] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first(&self) -> TradingDay {
        self.days[0]
    }

    pub fn last(&self) -> TradingDay {
        self.days[self.days.len() - 1]
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.days.binary_search(&day).is_ok()
    }

    /// Next trading day on or after the timestamp's date, if the index has one
    pub fn align_strict(&self, news_timestamp: NaiveDateTime) -> Option<TradingDay> {
        let date = news_timestamp.date();
        let idx = self.days.partition_point(|day| *day < date);
        self.days.get(idx).copied()
    }

    /// Trading day a news item is attributed to.
    ///
    /// News that postdates every indexed day is attributed to the last one.
    pub fn align(&self, news_timestamp: NaiveDateTime) -> TradingDay {
        self.align_strict(news_timestamp)
            .unwrap_or_else(|| self.last())
    }

    /// Align a batch, keeping input order and every item
    pub fn align_news(&self, items: &[NewsItem]) -> Vec<AlignedNewsItem> {
        self.align_news_with_policy(items, FallbackPolicy::LastTradingDay)
    }

    /// Align a batch; with [`FallbackPolicy::Exclude`] items later than the
    /// last trading day are dropped, the rest keep their order
    pub fn align_news_with_policy(
        &self,
        items: &[NewsItem],
        policy: FallbackPolicy,
    ) -> Vec<AlignedNewsItem> {
        let aligned: Vec<AlignedNewsItem> = items
            .iter()
            .filter_map(|item| {
                let trading_day = match policy {
                    FallbackPolicy::LastTradingDay => Some(self.align(item.timestamp)),
                    FallbackPolicy::Exclude => self.align_strict(item.timestamp),
                }?;
                Some(AlignedNewsItem {
                    item: item.clone(),
                    trading_day,
                })
            })
            .collect();

        if aligned.len() < items.len() {
            debug!(
                "Excluded {} news items published after {}",
                items.len() - aligned.len(),
                self.last()
            );
        }
        aligned
    }
}
