use chrono::{Duration, TimeZone, Utc};
use std::collections::HashSet;

use photo_sweep_core::analysis::groups::group_savings;
use photo_sweep_core::analysis::{GroupFilter, GroupProposal, MatchType, Period};
use photo_sweep_core::collaborators::NoCompression;
use photo_sweep_core::library::BuildOptions;
use photo_sweep_core::{Asset, AssetId, AssetKind, Error, Library, Scope, SelectionEngine};

fn asset(id: &str, size: u64, days_ago: i64) -> Asset {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 18, 0, 0).unwrap();
    Asset::new(id, size, now - Duration::days(days_ago), AssetKind::Photo)
}

fn options() -> BuildOptions {
    BuildOptions {
        filter: GroupFilter::default(),
        large_file_threshold_bytes: 5 * 1024 * 1024,
        now: Utc.with_ymd_and_hms(2024, 6, 15, 18, 0, 0).unwrap(),
    }
}

fn build(assets: Vec<Asset>, proposals: Vec<GroupProposal>) -> Result<Library, Error> {
    Library::build(assets, proposals, &options(), &NoCompression)
}

#[test]
fn test_library_rejects_proposal_with_unscanned_member() {
    let assets = vec![asset("a", 10, 0), asset("b", 10, 0)];
    let proposal = GroupProposal::new(
        1,
        MatchType::Exact,
        vec![asset("a", 10, 0), asset("ghost", 10, 0)],
    );
    assert!(matches!(build(assets, vec![proposal]), Err(Error::InvalidGroup(_))));
}

#[test]
fn test_similar_group_keeps_best_scored_member() {
    let members = vec![asset("x", 300, 3), asset("y", 200, 2), asset("z", 100, 1)];
    let proposal = GroupProposal::new(7, MatchType::Similar, members.clone())
        .with_confidence(0.93)
        .with_quality("x", 0.4)
        .with_quality("y", 0.9)
        .with_quality("z", 0.7);
    let library = build(members, vec![proposal]).unwrap();

    let group = library.group(7).unwrap();
    assert_eq!(group.recommended_member().id, AssetId::from("y"));
    assert_eq!(group_savings(group), 400);
}

#[test]
fn test_low_confidence_groups_are_filtered() {
    let members = vec![asset("x", 300, 3), asset("y", 200, 2)];
    let proposal = GroupProposal::new(1, MatchType::Similar, members.clone()).with_confidence(0.5);
    let options = BuildOptions {
        filter: GroupFilter {
            min_confidence: 0.85,
            ..GroupFilter::default()
        },
        ..options()
    };
    let library = Library::build(members, vec![proposal], &options, &NoCompression).unwrap();
    assert!(library.groups().is_empty());
    assert_eq!(library.overview().potential_savings_bytes, 0);
}

#[test]
fn test_screenshot_buckets_scope_selection() {
    let assets = vec![
        asset("today", 10, 0).screenshot(),
        asset("week", 20, 5).screenshot(),
        asset("old", 40, 90).screenshot(),
        asset("photo", 80, 0),
    ];
    let library = build(assets, vec![]).unwrap();
    assert_eq!(library.buckets().len(), 3);
    assert!(library.bucket(Period::Yesterday).is_none());

    let mut engine = SelectionEngine::new(library);
    engine.select_all(Scope::Period(Period::LastWeek)).unwrap();
    let totals = engine.totals(Scope::Global).unwrap();
    assert_eq!(totals.count, 1);
    assert_eq!(totals.bytes, 20);

    // an absent bucket is an empty scope, not an error
    engine.select_all(Scope::Period(Period::Yesterday)).unwrap();
    assert_eq!(engine.totals(Scope::Period(Period::Yesterday)).unwrap().count, 0);
}

#[test]
fn test_library_without_dissolves_and_recomputes() {
    let members = vec![asset("a", 100, 1), asset("b", 100, 2), asset("c", 100, 3)];
    let proposal = GroupProposal::new(1, MatchType::Burst, members.clone())
        .with_quality("a", 0.9)
        .with_quality("b", 0.5);
    let library = build(members, vec![proposal]).unwrap();
    assert_eq!(library.group(1).unwrap().recommended_member().id, AssetId::from("a"));

    let removed: HashSet<AssetId> = [AssetId::from("a")].into_iter().collect();
    let shrunk = library.without(&removed);
    let group = shrunk.group(1).unwrap();
    assert_eq!(group.members().len(), 2);
    assert_eq!(group.recommended_member().id, AssetId::from("b"));

    let removed: HashSet<AssetId> = [AssetId::from("a"), AssetId::from("b")].into_iter().collect();
    let dissolved = library.without(&removed);
    assert!(dissolved.groups().is_empty());
    assert_eq!(dissolved.assets().len(), 1);
}
