use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::asset::{Asset, AssetId};
use crate::error::Error;

pub type GroupId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Similar,
    Burst,
    Screenshot,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchType::Exact => "Exact Match",
            MatchType::Similar => "Visually Similar",
            MatchType::Burst => "Burst Photos",
            MatchType::Screenshot => "Screenshot Group",
        };
        f.write_str(label)
    }
}

/// A candidate group as emitted by the similarity engine, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupProposal {
    pub group_id: GroupId,
    pub match_type: MatchType,
    pub members: Vec<Asset>,
    /// Similarity confidence reported by the engine, if it reports one.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Externally computed quality scores; members without one rank last.
    #[serde(default)]
    pub quality_scores: HashMap<AssetId, f64>,
}

impl GroupProposal {
    pub fn new(group_id: GroupId, match_type: MatchType, members: Vec<Asset>) -> Self {
        Self {
            group_id,
            match_type,
            members,
            confidence: None,
            quality_scores: HashMap::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_quality(mut self, id: impl Into<AssetId>, score: f64) -> Self {
        self.quality_scores.insert(id.into(), score);
        self
    }
}

/// Confidence function used by the session: the engine's figure when present,
/// otherwise certain for exact matches and unknown (zero) for the rest.
pub fn reported_confidence(proposal: &GroupProposal) -> f64 {
    match (proposal.confidence, proposal.match_type) {
        (Some(c), _) => c,
        (None, MatchType::Exact) => 1.0,
        (None, _) => 0.0,
    }
}

/// A validated set of assets believed to duplicate one another.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    group_id: GroupId,
    match_type: MatchType,
    members: Vec<Asset>,
    confidence: f64,
    quality_scores: HashMap<AssetId, f64>,
    recommended: usize,
}

impl DuplicateGroup {
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    /// Members in the order the scanner produced them.
    pub fn members(&self) -> &[Asset] {
        &self.members
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn quality_score(&self, id: &AssetId) -> Option<f64> {
        self.quality_scores.get(id).copied()
    }

    pub fn recommended_member(&self) -> &Asset {
        &self.members[self.recommended]
    }

    pub fn is_recommended(&self, id: &AssetId) -> bool {
        self.recommended_member().id == *id
    }

    /// Members that "Keep Recommended" would delete.
    pub fn deletion_candidates(&self) -> impl Iterator<Item = &Asset> {
        let keep = self.recommended;
        self.members
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != keep)
            .map(|(_, a)| a)
    }

    pub fn total_bytes(&self) -> u64 {
        self.members.iter().map(|a| a.size_bytes).sum()
    }

    pub fn savings_bytes(&self) -> u64 {
        self.total_bytes() - self.recommended_member().size_bytes
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.members.iter().any(|a| a.id == *id)
    }

    /// Rebuild the group without `removed`. Returns `None` once fewer than two
    /// members survive. The recommendation is recomputed with the same policy.
    pub fn without(&self, removed: &HashSet<AssetId>) -> Option<DuplicateGroup> {
        let members: Vec<Asset> = self
            .members
            .iter()
            .filter(|a| !removed.contains(&a.id))
            .cloned()
            .collect();
        if members.len() < 2 {
            return None;
        }
        let quality_scores: HashMap<AssetId, f64> = self
            .quality_scores
            .iter()
            .filter(|(id, _)| !removed.contains(*id))
            .map(|(id, s)| (id.clone(), *s))
            .collect();
        let recommended = recommend(self.match_type, &members, &quality_scores);
        Some(DuplicateGroup {
            group_id: self.group_id,
            match_type: self.match_type,
            members,
            confidence: self.confidence,
            quality_scores,
            recommended,
        })
    }
}

pub fn recommended_member(group: &DuplicateGroup) -> &Asset {
    group.recommended_member()
}

pub fn group_savings(group: &DuplicateGroup) -> u64 {
    group.savings_bytes()
}

/// Index of the member to keep. Exact and screenshot groups keep the first
/// member; similar and burst groups keep the best quality score, then the
/// earliest capture, then the earliest insertion.
fn recommend(match_type: MatchType, members: &[Asset], scores: &HashMap<AssetId, f64>) -> usize {
    match match_type {
        MatchType::Exact | MatchType::Screenshot => 0,
        MatchType::Similar | MatchType::Burst => {
            let score = |a: &Asset| scores.get(&a.id).copied().filter(|s| !s.is_nan());
            let mut best = 0;
            for (i, candidate) in members.iter().enumerate().skip(1) {
                let current = &members[best];
                let by_score = match (score(candidate), score(current)) {
                    (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (None, None) => Ordering::Equal,
                };
                let better = match by_score {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => candidate.captured_at < current.captured_at,
                };
                if better {
                    best = i;
                }
            }
            best
        }
    }
}

/// Validate proposals into non-overlapping groups.
///
/// The whole batch is rejected on the first malformed proposal so that a
/// partially built library never reaches the selection engine.
pub fn build_groups<F>(proposals: Vec<GroupProposal>, confidence_fn: F) -> Result<Vec<DuplicateGroup>, Error>
where
    F: Fn(&GroupProposal) -> f64,
{
    let mut seen_assets: HashSet<AssetId> = HashSet::new();
    let mut seen_groups: HashSet<GroupId> = HashSet::new();
    let mut groups = Vec::with_capacity(proposals.len());

    for proposal in proposals {
        if proposal.members.len() < 2 {
            return Err(Error::InvalidGroup(format!(
                "group {} has {} member(s), at least 2 required",
                proposal.group_id,
                proposal.members.len()
            )));
        }
        if !seen_groups.insert(proposal.group_id) {
            return Err(Error::InvalidGroup(format!(
                "group id {} is used more than once",
                proposal.group_id
            )));
        }
        for member in &proposal.members {
            if !seen_assets.insert(member.id.clone()) {
                return Err(Error::InvalidGroup(format!(
                    "asset {} appears in more than one group (group {})",
                    member.id, proposal.group_id
                )));
            }
        }

        let confidence = confidence_fn(&proposal);
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidGroup(format!(
                "group {} confidence {} is outside [0, 1]",
                proposal.group_id, confidence
            )));
        }

        let recommended = recommend(proposal.match_type, &proposal.members, &proposal.quality_scores);
        groups.push(DuplicateGroup {
            group_id: proposal.group_id,
            match_type: proposal.match_type,
            members: proposal.members,
            confidence,
            quality_scores: proposal.quality_scores,
            recommended,
        });
    }

    debug!("Built {} duplicate groups", groups.len());
    Ok(groups)
}

/// Scan preferences that decide which groups are shown at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupFilter {
    pub min_confidence: f64,
    pub include_screenshots: bool,
    pub include_bursts: bool,
}

impl Default for GroupFilter {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            include_screenshots: true,
            include_bursts: true,
        }
    }
}

impl GroupFilter {
    pub fn retains(&self, group: &DuplicateGroup) -> bool {
        match group.match_type() {
            MatchType::Exact => true,
            MatchType::Screenshot => self.include_screenshots,
            MatchType::Burst => self.include_bursts && group.confidence() >= self.min_confidence,
            MatchType::Similar => group.confidence() >= self.min_confidence,
        }
    }

    pub fn apply(&self, groups: Vec<DuplicateGroup>) -> Vec<DuplicateGroup> {
        groups.into_iter().filter(|g| self.retains(g)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetKind;
    use chrono::{TimeZone, Utc};

    const MB_2_8: u64 = 2_800_000;

    fn photo(id: &str, size: u64, day: u32) -> Asset {
        let at = Utc.with_ymd_and_hms(2024, 11, day, 10, 0, 0).unwrap();
        Asset::new(id, size, at, AssetKind::Photo)
    }

    #[test]
    fn test_exact_group_keeps_first_and_saves_the_rest() {
        let proposal = GroupProposal::new(
            1,
            MatchType::Exact,
            vec![photo("dup1-1", MB_2_8, 15), photo("dup1-2", MB_2_8, 15), photo("dup1-3", MB_2_8, 15)],
        );
        let groups = build_groups(vec![proposal], reported_confidence).unwrap();
        let group = &groups[0];
        assert_eq!(recommended_member(group).id.as_str(), "dup1-1");
        assert_eq!(group_savings(group), 2 * MB_2_8);
        assert_eq!(group.confidence(), 1.0);
    }

    #[test]
    fn test_similar_group_prefers_quality_score() {
        let proposal = GroupProposal::new(
            2,
            MatchType::Similar,
            vec![photo("a", 3_100_000, 10), photo("b", 3_000_000, 10)],
        )
        .with_confidence(0.92)
        .with_quality("a", 87.0)
        .with_quality("b", 95.0);
        let groups = build_groups(vec![proposal], reported_confidence).unwrap();
        assert_eq!(groups[0].recommended_member().id.as_str(), "b");
        assert_eq!(groups[0].savings_bytes(), 3_100_000);
    }

    #[test]
    fn test_quality_tie_breaks_by_earliest_capture() {
        let proposal = GroupProposal::new(
            3,
            MatchType::Burst,
            vec![photo("late", 10, 9), photo("early", 10, 8), photo("unscored", 10, 1)],
        )
        .with_quality("late", 90.0)
        .with_quality("early", 90.0);
        let groups = build_groups(vec![proposal], |_| 0.95).unwrap();
        assert_eq!(groups[0].recommended_member().id.as_str(), "early");
    }

    #[test]
    fn test_unscored_burst_keeps_earliest_then_first_inserted() {
        let proposal = GroupProposal::new(
            4,
            MatchType::Burst,
            vec![photo("b1", 10, 8), photo("b0", 10, 7), photo("b2", 10, 7)],
        );
        let groups = build_groups(vec![proposal], |_| 0.9).unwrap();
        assert_eq!(groups[0].recommended_member().id.as_str(), "b0");
    }

    #[test]
    fn test_recommendation_is_stable_across_rebuilds() {
        let make = || {
            GroupProposal::new(5, MatchType::Similar, vec![photo("x", 1, 2), photo("y", 1, 2)])
                .with_quality("x", 50.0)
                .with_quality("y", 50.0)
        };
        let first = build_groups(vec![make()], |_| 0.9).unwrap();
        let second = build_groups(vec![make()], |_| 0.9).unwrap();
        assert_eq!(first[0].recommended_member().id, second[0].recommended_member().id);
        assert_eq!(first[0].recommended_member().id.as_str(), "x");
    }

    #[test]
    fn test_single_member_group_is_rejected() {
        let proposal = GroupProposal::new(1, MatchType::Exact, vec![photo("solo", 1, 1)]);
        let err = build_groups(vec![proposal], reported_confidence).unwrap_err();
        assert!(matches!(err, Error::InvalidGroup(_)));
    }

    #[test]
    fn test_asset_in_two_groups_is_rejected() {
        let proposals = vec![
            GroupProposal::new(1, MatchType::Exact, vec![photo("a", 1, 1), photo("b", 1, 1)]),
            GroupProposal::new(2, MatchType::Exact, vec![photo("b", 1, 1), photo("c", 1, 1)]),
        ];
        let err = build_groups(proposals, reported_confidence).unwrap_err();
        assert!(matches!(err, Error::InvalidGroup(msg) if msg.contains("asset b")));
    }

    #[test]
    fn test_confidence_out_of_range_is_rejected() {
        let proposal = GroupProposal::new(1, MatchType::Similar, vec![photo("a", 1, 1), photo("b", 1, 1)])
            .with_confidence(1.2);
        assert!(build_groups(vec![proposal], reported_confidence).is_err());
    }

    #[test]
    fn test_without_dissolves_small_groups() {
        let proposal = GroupProposal::new(
            1,
            MatchType::Exact,
            vec![photo("a", 5, 1), photo("b", 5, 1), photo("c", 5, 1)],
        );
        let group = build_groups(vec![proposal], reported_confidence).unwrap().remove(0);

        let removed: HashSet<AssetId> = [AssetId::from("a")].into_iter().collect();
        let shrunk = group.without(&removed).unwrap();
        assert_eq!(shrunk.members().len(), 2);
        assert_eq!(shrunk.recommended_member().id.as_str(), "b");

        let removed: HashSet<AssetId> = ["b", "c"].into_iter().map(AssetId::from).collect();
        assert!(group.without(&removed).is_none());
    }

    #[test]
    fn test_filter_drops_low_confidence_and_excluded_types() {
        let proposals = vec![
            GroupProposal::new(1, MatchType::Exact, vec![photo("a", 1, 1), photo("b", 1, 1)]),
            GroupProposal::new(2, MatchType::Similar, vec![photo("c", 1, 1), photo("d", 1, 1)])
                .with_confidence(0.80),
            GroupProposal::new(3, MatchType::Burst, vec![photo("e", 1, 1), photo("f", 1, 1)])
                .with_confidence(0.99),
            GroupProposal::new(4, MatchType::Screenshot, vec![photo("g", 1, 1), photo("h", 1, 1)]),
        ];
        let groups = build_groups(proposals, reported_confidence).unwrap();
        let filter = GroupFilter {
            min_confidence: 0.85,
            include_screenshots: true,
            include_bursts: false,
        };
        let kept: Vec<GroupId> = filter.apply(groups).iter().map(|g| g.group_id()).collect();
        assert_eq!(kept, vec![1, 4]);
    }
}
