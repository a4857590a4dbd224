use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use photo_sweep_core::analysis::{GroupProposal, MatchType};
use photo_sweep_core::collaborators::{
    CompressionOutcome, CompressionService, DeletionExecutor, DeletionOutcome, PhotoScanner,
    SimilarityEngine,
};
use photo_sweep_core::{Asset, AssetId, Error};

/// Confidence reported for near-duplicates that differ in size.
const SIMILAR_CONFIDENCE: f64 = 0.9;

/// One asset as listed in a library manifest, plus the hints a real device
/// would compute (quality score and compressed-size estimate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(flatten)]
    pub asset: Asset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_estimate: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ManifestFile {
    assets: Vec<ManifestEntry>,
}

/// A JSON file standing in for the device photo library.
///
/// Scanning reads the file, deleting and compressing rewrite it.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    estimates: HashMap<AssetId, u64>,
    quality: HashMap<AssetId, f64>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = read_manifest(path)?;
        let mut estimates = HashMap::new();
        let mut quality = HashMap::new();
        for entry in &file.assets {
            if let Some(est) = entry.compressed_estimate {
                estimates.insert(entry.asset.id.clone(), est);
            }
            if let Some(q) = entry.quality {
                quality.insert(entry.asset.id.clone(), q);
            }
        }
        debug!("Loaded manifest {} ({} assets)", path.display(), file.assets.len());
        Ok(Self {
            path: path.to_path_buf(),
            estimates,
            quality,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_manifest(path: &Path) -> Result<ManifestFile, Error> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_manifest(path: &Path, file: &ManifestFile) -> Result<(), Error> {
    let contents = serde_json::to_string_pretty(file)?;
    fs::write(path, contents)?;
    Ok(())
}

impl PhotoScanner for Manifest {
    fn scan(&self) -> Result<Vec<Asset>, String> {
        let file = read_manifest(&self.path).map_err(|e| e.to_string())?;
        Ok(file.assets.into_iter().map(|e| e.asset).collect())
    }
}

impl SimilarityEngine for Manifest {
    /// Assets sharing a perceptual key form one group. Identical sizes are
    /// exact copies, all-screenshot groups are screenshot matches, anything
    /// else is a similar match scored by the manifest's quality hints.
    fn group(&self, assets: &[Asset]) -> Vec<GroupProposal> {
        let mut order: Vec<&str> = Vec::new();
        let mut by_key: HashMap<&str, Vec<Asset>> = HashMap::new();
        for asset in assets {
            if let Some(key) = asset.perceptual_key.as_deref() {
                let members = by_key.entry(key).or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                });
                members.push(asset.clone());
            }
        }

        let mut proposals = Vec::new();
        for key in order {
            let members = match by_key.remove(key) {
                Some(members) if members.len() >= 2 => members,
                _ => continue,
            };
            let group_id = proposals.len() as u64 + 1;
            let sizes: HashSet<u64> = members.iter().map(|a| a.size_bytes).collect();
            let match_type = if members.iter().all(|a| a.is_screenshot) {
                MatchType::Screenshot
            } else if sizes.len() == 1 {
                MatchType::Exact
            } else {
                MatchType::Similar
            };

            let mut proposal = GroupProposal::new(group_id, match_type, members.clone());
            if match_type == MatchType::Similar {
                proposal = proposal.with_confidence(SIMILAR_CONFIDENCE);
                for member in &members {
                    if let Some(score) = self.quality.get(&member.id) {
                        proposal = proposal.with_quality(member.id.clone(), *score);
                    }
                }
            }
            proposals.push(proposal);
        }
        proposals
    }
}

impl CompressionService for Manifest {
    fn estimate(&self, asset: &Asset) -> Option<u64> {
        self.estimates.get(&asset.id).copied()
    }

    fn compress(&self, assets: &[Asset]) -> Result<CompressionOutcome, String> {
        let mut file = read_manifest(&self.path).map_err(|e| e.to_string())?;
        let targets: HashSet<&AssetId> = assets.iter().map(|a| &a.id).collect();
        let mut outcome = CompressionOutcome::default();
        for entry in file.assets.iter_mut() {
            if !targets.contains(&entry.asset.id) {
                continue;
            }
            if let Some(est) = entry.compressed_estimate.take() {
                if est < entry.asset.size_bytes {
                    outcome.bytes_saved += entry.asset.size_bytes - est;
                    entry.asset.size_bytes = est;
                    outcome.compressed += 1;
                }
            }
        }
        write_manifest(&self.path, &file).map_err(|e| e.to_string())?;
        info!("Manifest rewritten after compressing {} assets", outcome.compressed);
        Ok(outcome)
    }
}

impl DeletionExecutor for Manifest {
    fn delete(&self, assets: &[Asset]) -> Result<DeletionOutcome, String> {
        let mut file = read_manifest(&self.path).map_err(|e| e.to_string())?;
        let targets: HashSet<&AssetId> = assets.iter().map(|a| &a.id).collect();
        let before = file.assets.len();
        let bytes_freed = file
            .assets
            .iter()
            .filter(|e| targets.contains(&e.asset.id))
            .map(|e| e.asset.size_bytes)
            .sum();
        file.assets.retain(|e| !targets.contains(&e.asset.id));
        let deleted = before - file.assets.len();
        write_manifest(&self.path, &file).map_err(|e| e.to_string())?;
        info!("Manifest rewritten after deleting {} assets", deleted);
        Ok(DeletionOutcome {
            deleted,
            bytes_freed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "assets": [
            {"id": "a", "size_bytes": 2800000, "captured_at": "2024-03-01T10:00:00Z", "kind": "photo", "perceptual_key": "k1"},
            {"id": "b", "size_bytes": 2800000, "captured_at": "2024-03-01T10:00:01Z", "kind": "photo", "perceptual_key": "k1"},
            {"id": "c", "size_bytes": 1900000, "captured_at": "2024-03-02T10:00:00Z", "kind": "photo", "perceptual_key": "k2", "quality": 0.2},
            {"id": "d", "size_bytes": 2100000, "captured_at": "2024-03-02T10:00:05Z", "kind": "photo", "perceptual_key": "k2", "quality": 0.8},
            {"id": "clip", "size_bytes": 60000000, "captured_at": "2024-01-05T08:00:00Z", "kind": "video", "compressed_estimate": 20000000}
        ]
    }"#;

    fn sample_manifest() -> (tempfile::TempDir, Manifest) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("library.json");
        fs::write(&path, SAMPLE).unwrap();
        let manifest = Manifest::load(&path).unwrap();
        (dir, manifest)
    }

    #[test]
    fn test_groups_by_perceptual_key() {
        let (_dir, manifest) = sample_manifest();
        let assets = manifest.scan().unwrap();
        let proposals = manifest.group(&assets);
        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].match_type, MatchType::Exact);
        assert_eq!(proposals[1].match_type, MatchType::Similar);
        assert_eq!(proposals[1].quality_scores.get(&AssetId::from("d")), Some(&0.8));
    }

    #[test]
    fn test_delete_rewrites_manifest() {
        let (_dir, manifest) = sample_manifest();
        let assets = manifest.scan().unwrap();
        let outcome = manifest.delete(&assets[1..2]).unwrap();
        assert_eq!(outcome.deleted, 1);
        assert_eq!(outcome.bytes_freed, 2_800_000);

        let remaining = manifest.scan().unwrap();
        assert_eq!(remaining.len(), 4);
        assert!(remaining.iter().all(|a| a.id.as_str() != "b"));
    }

    #[test]
    fn test_compress_applies_estimate_once() {
        let (_dir, manifest) = sample_manifest();
        let clip: Vec<Asset> = manifest
            .scan()
            .unwrap()
            .into_iter()
            .filter(|a| a.id.as_str() == "clip")
            .collect();
        let outcome = manifest.compress(&clip).unwrap();
        assert_eq!(outcome.compressed, 1);
        assert_eq!(outcome.bytes_saved, 40_000_000);

        let again = manifest.compress(&clip).unwrap();
        assert_eq!(again.compressed, 0);
    }

    #[test]
    fn test_missing_manifest_fails_scan() {
        let dir = tempdir().unwrap();
        assert!(Manifest::load(&dir.path().join("absent.json")).is_err());
    }
}
