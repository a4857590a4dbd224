pub mod groups;
pub mod large_files;
pub mod periods;

pub use groups::{build_groups, DuplicateGroup, GroupFilter, GroupId, GroupProposal, MatchType};
pub use large_files::{build_large_files, LargeFile, SizeTier};
pub use periods::{bucket_screenshots, Period, PeriodBucket};
