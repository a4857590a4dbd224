use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable identifier assigned to an asset by the device photo library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for AssetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Photo,
    Video,
}

/// One photo or video on the device. Never mutated after the scan produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    #[serde(default)]
    pub filename: String,
    pub size_bytes: u64,
    pub captured_at: DateTime<Utc>,
    pub kind: AssetKind,
    #[serde(default)]
    pub is_screenshot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perceptual_key: Option<String>,
}

impl Asset {
    pub fn new(
        id: impl Into<AssetId>,
        size_bytes: u64,
        captured_at: DateTime<Utc>,
        kind: AssetKind,
    ) -> Self {
        let id = id.into();
        Self {
            filename: id.as_str().to_string(),
            id,
            size_bytes,
            captured_at,
            kind,
            is_screenshot: false,
            perceptual_key: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_perceptual_key(mut self, key: impl Into<String>) -> Self {
        self.perceptual_key = Some(key.into());
        self
    }

    pub fn screenshot(mut self) -> Self {
        self.is_screenshot = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Size,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Photo,
    Video,
}

impl KindFilter {
    pub fn matches(self, asset: &Asset) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Photo => asset.kind == AssetKind::Photo,
            KindFilter::Video => asset.kind == AssetKind::Video,
        }
    }
}

/// Borrowed, re-ordered view of `assets` for display. The source slice keeps
/// its scan order; equal keys keep their relative order.
pub fn sorted_view<'a, I>(assets: I, key: SortKey, order: SortOrder) -> Vec<&'a Asset>
where
    I: IntoIterator<Item = &'a Asset>,
{
    let mut view: Vec<&Asset> = assets.into_iter().collect();
    view.sort_by(|a, b| {
        let ord = match key {
            SortKey::Date => a.captured_at.cmp(&b.captured_at),
            SortKey::Size => a.size_bytes.cmp(&b.size_bytes),
            SortKey::Name => a.filename.cmp(&b.filename),
        };
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
    view
}

pub fn filter_by_kind<'a, I>(assets: I, filter: KindFilter) -> Vec<&'a Asset>
where
    I: IntoIterator<Item = &'a Asset>,
{
    assets.into_iter().filter(|a| filter.matches(a)).collect()
}
