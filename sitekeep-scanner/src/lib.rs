pub mod capture;
pub mod crawler;
pub mod error;
pub mod frontier;
pub mod rules;
pub mod types;

pub use capture::{ArchiveSink, HttpCapture, PageCapture};
pub use crawler::{CaptureRegistry, FinishCallback, ProgressCallback, SiteCrawler};
pub use error::ScanError;
pub use frontier::Frontier;
pub use rules::RuleSet;
pub use types::{ArchiveDraft, CaptureOptions, Link, PageArchive, SeedBookmark};
