use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use photo_sweep_core::asset::{KindFilter, SortKey, SortOrder};

#[derive(Debug, Parser)]
#[command(name = "photo-sweep")]
#[command(about = "Find and clear duplicate photos, old screenshots and oversized videos", long_about = None)]
pub struct Cli {
    /// Library manifest (JSON) standing in for the device photo library
    #[arg(short, long, global = true, default_value = "library.json")]
    pub manifest: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the library (uses one free scan) and print duplicate groups, screenshots and large files
    Scan {
        /// Sort order for the screenshot and large-file lists
        #[arg(long, value_enum, default_value_t = SortArg::Size)]
        sort: SortArg,
        /// Only list this kind of asset among large files
        #[arg(long, value_enum, default_value_t = KindArg::All)]
        kind: KindArg,
    },
    /// Select deletion candidates from the current library and delete them after confirmation
    Clean {
        #[arg(value_enum)]
        target: CleanTarget,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Compress every compressible large file in the current library (Pro)
    Compress {
        #[arg(short, long)]
        yes: bool,
    },
    /// Show device storage usage
    Storage {
        /// Used bytes
        used: u64,
        /// Total capacity in bytes
        total: u64,
    },
    /// Show the current tier and remaining quota
    Status,
    /// Record a confirmed Pro purchase
    Upgrade,
    /// Record a lapsed Pro subscription
    Lapse,
    /// Start a new billing period, restoring free quotas
    Rollover,
    /// List recent scans
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete the scan history
    ClearHistory,
    /// Print configuration values
    PrintConfig,
    /// Truncate all database tables
    TruncateDb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CleanTarget {
    /// Every non-recommended member of every duplicate group
    Duplicates,
    /// Every screenshot, across all periods
    Screenshots,
    /// Every file above the large-file threshold
    LargeFiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Date,
    Size,
    Name,
}

impl SortArg {
    /// Newest and largest first; names alphabetically.
    pub fn key_and_order(self) -> (SortKey, SortOrder) {
        match self {
            SortArg::Date => (SortKey::Date, SortOrder::Descending),
            SortArg::Size => (SortKey::Size, SortOrder::Descending),
            SortArg::Name => (SortKey::Name, SortOrder::Ascending),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    All,
    Photo,
    Video,
}

impl From<KindArg> for KindFilter {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::All => KindFilter::All,
            KindArg::Photo => KindFilter::Photo,
            KindArg::Video => KindFilter::Video,
        }
    }
}
