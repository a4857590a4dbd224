use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

use crate::asset::{Asset, AssetId};
use crate::collaborators::CompressionService;

const MIB: u64 = 1024 * 1024;

/// Display emphasis for a large file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SizeTier {
    Normal,
    Medium,
    Large,
    Huge,
}

impl SizeTier {
    pub fn for_size(size_bytes: u64) -> SizeTier {
        if size_bytes > 50 * MIB {
            SizeTier::Huge
        } else if size_bytes > 20 * MIB {
            SizeTier::Large
        } else if size_bytes > 10 * MIB {
            SizeTier::Medium
        } else {
            SizeTier::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LargeFile {
    pub asset: Asset,
    pub estimated_compressed_bytes: Option<u64>,
}

impl LargeFile {
    pub fn is_compressible(&self) -> bool {
        matches!(self.estimated_compressed_bytes, Some(est) if est < self.asset.size_bytes)
    }

    pub fn compression_savings(&self) -> u64 {
        match self.estimated_compressed_bytes {
            Some(est) if est < self.asset.size_bytes => self.asset.size_bytes - est,
            _ => 0,
        }
    }

    pub fn size_tier(&self) -> SizeTier {
        SizeTier::for_size(self.asset.size_bytes)
    }
}

/// Assets strictly above `threshold_bytes`, in scan order, each with a
/// compression estimate. Estimates are requested in parallel.
pub fn build_large_files(
    assets: &[Asset],
    threshold_bytes: u64,
    compression: &dyn CompressionService,
) -> Vec<LargeFile> {
    let start = Instant::now();
    let candidates: Vec<&Asset> = assets
        .iter()
        .filter(|a| a.size_bytes > threshold_bytes)
        .collect();

    let files: Vec<LargeFile> = candidates
        .par_iter()
        .map(|asset| LargeFile {
            asset: (*asset).clone(),
            estimated_compressed_bytes: compression.estimate(asset),
        })
        .collect();

    debug!(
        "Large-file triage: {} of {} assets over {} bytes in {:.2}s",
        files.len(),
        assets.len(),
        threshold_bytes,
        start.elapsed().as_secs_f64()
    );
    files
}

/// Total estimated savings if every listed id were compressed.
pub fn compression_savings<'a, I>(files: &[LargeFile], ids: I) -> u64
where
    I: IntoIterator<Item = &'a AssetId>,
{
    ids.into_iter()
        .filter_map(|id| files.iter().find(|f| f.asset.id == *id))
        .map(|f| f.compression_savings())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetKind;
    use crate::collaborators::CompressionOutcome;
    use chrono::Utc;

    /// Estimates a third of the original size for photos only.
    struct ThirdForPhotos;

    impl CompressionService for ThirdForPhotos {
        fn estimate(&self, asset: &Asset) -> Option<u64> {
            match asset.kind {
                AssetKind::Photo => Some(asset.size_bytes / 3),
                AssetKind::Video => None,
            }
        }

        fn compress(&self, _assets: &[Asset]) -> Result<CompressionOutcome, String> {
            Ok(CompressionOutcome::default())
        }
    }

    fn asset(id: &str, mib: u64, kind: AssetKind) -> Asset {
        Asset::new(id, mib * MIB, Utc::now(), kind)
    }

    #[test]
    fn test_threshold_is_exclusive_and_order_kept() {
        let assets = vec![
            asset("large-1", 28, AssetKind::Photo),
            asset("small", 5, AssetKind::Photo),
            asset("large-2", 156, AssetKind::Video),
            asset("large-3", 12, AssetKind::Photo),
        ];
        let files = build_large_files(&assets, 5 * MIB, &ThirdForPhotos);
        let ids: Vec<&str> = files.iter().map(|f| f.asset.id.as_str()).collect();
        assert_eq!(ids, vec!["large-1", "large-2", "large-3"]);
    }

    #[test]
    fn test_compressibility_and_savings() {
        let assets = vec![
            asset("p", 30, AssetKind::Photo),
            asset("v", 90, AssetKind::Video),
        ];
        let files = build_large_files(&assets, 0, &ThirdForPhotos);
        assert!(files[0].is_compressible());
        assert_eq!(files[0].compression_savings(), 20 * MIB);
        assert!(!files[1].is_compressible());
        assert_eq!(files[1].compression_savings(), 0);

        let ids = [AssetId::from("p"), AssetId::from("v")];
        assert_eq!(compression_savings(&files, ids.iter()), 20 * MIB);
    }

    #[test]
    fn test_estimate_not_smaller_is_not_compressible() {
        let file = LargeFile {
            asset: asset("x", 10, AssetKind::Photo),
            estimated_compressed_bytes: Some(10 * MIB),
        };
        assert!(!file.is_compressible());
    }

    #[test]
    fn test_size_tiers() {
        assert_eq!(SizeTier::for_size(8 * MIB), SizeTier::Normal);
        assert_eq!(SizeTier::for_size(12 * MIB), SizeTier::Medium);
        assert_eq!(SizeTier::for_size(28 * MIB), SizeTier::Large);
        assert_eq!(SizeTier::for_size(156 * MIB), SizeTier::Huge);
    }
}
