use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::asset::{Asset, AssetId};

/// Age bucket for screenshots, relative to the moment the buckets were built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    Today,
    Yesterday,
    LastWeek,
    LastMonth,
    Older,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::Today,
        Period::Yesterday,
        Period::LastWeek,
        Period::LastMonth,
        Period::Older,
    ];

    /// Calendar-day classification. Timestamps in the future count as today.
    pub fn classify(captured_at: DateTime<Utc>, now: DateTime<Utc>) -> Period {
        let days = (now.date_naive() - captured_at.date_naive()).num_days();
        match days {
            i64::MIN..=0 => Period::Today,
            1 => Period::Yesterday,
            2..=7 => Period::LastWeek,
            8..=30 => Period::LastMonth,
            _ => Period::Older,
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Period> {
        Period::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Period::Today => "Today",
            Period::Yesterday => "Yesterday",
            Period::LastWeek => "Last Week",
            Period::LastMonth => "Last Month",
            Period::Older => "Older",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodBucket {
    period: Period,
    assets: Vec<Asset>,
}

impl PeriodBucket {
    pub fn period(&self) -> Period {
        self.period
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn total_bytes(&self) -> u64 {
        self.assets.iter().map(|a| a.size_bytes).sum()
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.assets.iter().any(|a| a.id == *id)
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&Asset) -> bool) {
        self.assets.retain(|a| keep(a));
    }
}

/// Partition the screenshot assets into period buckets, newest period first.
/// Scan order is preserved inside each bucket and empty buckets are omitted.
pub fn bucket_screenshots(assets: &[Asset], now: DateTime<Utc>) -> Vec<PeriodBucket> {
    let mut buckets: Vec<PeriodBucket> = Period::ALL
        .iter()
        .map(|&period| PeriodBucket {
            period,
            assets: Vec::new(),
        })
        .collect();

    for asset in assets.iter().filter(|a| a.is_screenshot) {
        let period = Period::classify(asset.captured_at, now);
        buckets[period.index() as usize].assets.push(asset.clone());
    }

    buckets.retain(|b| !b.assets.is_empty());
    buckets
}
