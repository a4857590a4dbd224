use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::analysis::groups::{build_groups, reported_confidence, DuplicateGroup, GroupFilter, GroupId, GroupProposal};
use crate::analysis::large_files::{build_large_files, LargeFile};
use crate::analysis::periods::{bucket_screenshots, Period, PeriodBucket};
use crate::asset::{Asset, AssetId};
use crate::collaborators::CompressionService;
use crate::error::Error;

/// A set of assets that selection and totals operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Group(GroupId),
    Period(Period),
    LargeFiles,
    Global,
}

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub filter: GroupFilter,
    pub large_file_threshold_bytes: u64,
    pub now: DateTime<Utc>,
}

/// Dashboard figures for a built library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LibraryOverview {
    pub total_assets: usize,
    pub total_bytes: u64,
    pub duplicate_groups: usize,
    pub potential_savings_bytes: u64,
    pub large_files: usize,
    pub screenshots: usize,
}

/// Everything one scan produced: the scanned assets plus the duplicate
/// groups, screenshot buckets and large-file list derived from them.
/// Read-only once built; a deletion produces a new library.
#[derive(Debug, Clone, Default)]
pub struct Library {
    assets: Vec<Asset>,
    groups: Vec<DuplicateGroup>,
    buckets: Vec<PeriodBucket>,
    large_files: Vec<LargeFile>,
    /// Position of each asset in `assets`.
    index: HashMap<AssetId, usize>,
}

fn index_assets(assets: &[Asset]) -> HashMap<AssetId, usize> {
    assets
        .iter()
        .enumerate()
        .map(|(i, a)| (a.id.clone(), i))
        .collect()
}

impl Library {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build(
        assets: Vec<Asset>,
        proposals: Vec<GroupProposal>,
        options: &BuildOptions,
        compression: &dyn CompressionService,
    ) -> Result<Library, Error> {
        let mut seen: HashSet<AssetId> = HashSet::with_capacity(assets.len());
        let mut unique = Vec::with_capacity(assets.len());
        for asset in assets {
            if seen.insert(asset.id.clone()) {
                unique.push(asset);
            } else {
                warn!("Scanner reported asset {} twice, keeping the first", asset.id);
            }
        }

        for proposal in &proposals {
            if let Some(stray) = proposal.members.iter().find(|m| !seen.contains(&m.id)) {
                return Err(Error::InvalidGroup(format!(
                    "group {} references asset {} which was not scanned",
                    proposal.group_id, stray.id
                )));
            }
        }

        let groups = options.filter.apply(build_groups(proposals, reported_confidence)?);
        let buckets = bucket_screenshots(&unique, options.now);
        let large_files =
            build_large_files(&unique, options.large_file_threshold_bytes, compression);

        debug!(
            "Library built: {} assets, {} groups, {} periods, {} large files",
            unique.len(),
            groups.len(),
            buckets.len(),
            large_files.len()
        );

        Ok(Library {
            index: index_assets(&unique),
            assets: unique,
            groups,
            buckets,
            large_files,
        })
    }

    /// Every scanned asset, in scan order.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    pub fn group(&self, group_id: GroupId) -> Option<&DuplicateGroup> {
        self.groups.iter().find(|g| g.group_id() == group_id)
    }

    pub fn buckets(&self) -> &[PeriodBucket] {
        &self.buckets
    }

    pub fn bucket(&self, period: Period) -> Option<&PeriodBucket> {
        self.buckets.iter().find(|b| b.period() == period)
    }

    pub fn large_files(&self) -> &[LargeFile] {
        &self.large_files
    }

    pub fn asset(&self, id: &AssetId) -> Option<&Asset> {
        self.index.get(id).map(|&i| &self.assets[i])
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.index.contains_key(id)
    }

    /// Assets in `scope`, each at most once, in display order.
    pub fn scope_assets(&self, scope: Scope) -> Result<Vec<&Asset>, Error> {
        let assets: Vec<&Asset> = match scope {
            Scope::Group(group_id) => self
                .group(group_id)
                .ok_or(Error::UnknownGroup(group_id))?
                .members()
                .iter()
                .collect(),
            Scope::Period(period) => self
                .bucket(period)
                .map(|b| b.assets().iter().collect())
                .unwrap_or_default(),
            Scope::LargeFiles => self.large_files.iter().map(|f| &f.asset).collect(),
            Scope::Global => self.assets.iter().collect(),
        };
        Ok(assets)
    }

    /// Rebuild without `removed`. Groups left with fewer than two members
    /// dissolve, emptied buckets disappear.
    pub fn without(&self, removed: &HashSet<AssetId>) -> Library {
        let keep = |a: &Asset| !removed.contains(&a.id);
        let mut buckets = self.buckets.clone();
        for bucket in &mut buckets {
            bucket.retain(keep);
        }
        buckets.retain(|b| !b.assets().is_empty());

        let assets: Vec<Asset> = self.assets.iter().filter(|a| keep(*a)).cloned().collect();
        Library {
            index: index_assets(&assets),
            assets,
            groups: self.groups.iter().filter_map(|g| g.without(removed)).collect(),
            buckets,
            large_files: self
                .large_files
                .iter()
                .filter(|f| keep(&f.asset))
                .cloned()
                .collect(),
        }
    }

    pub fn overview(&self) -> LibraryOverview {
        LibraryOverview {
            total_assets: self.assets.len(),
            total_bytes: self.assets.iter().map(|a| a.size_bytes).sum(),
            duplicate_groups: self.groups.len(),
            potential_savings_bytes: self.groups.iter().map(|g| g.savings_bytes()).sum(),
            large_files: self.large_files.len(),
            screenshots: self.buckets.iter().map(|b| b.assets().len()).sum(),
        }
    }
}
