pub mod aggregate;
pub mod collector;
pub mod commands;
pub mod correlator;
pub mod dedup;
pub mod flagger;
pub mod report;
pub mod surface;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use aggregate::TextBlock;
pub use collector::{collect, CollectOptions, Collection, Completeness};
pub use commands::{dispatch, Access, CommandTag, Request};
pub use correlator::{correlate, CorrelateOptions, Correlation, DeviceSignals};
pub use dedup::DedupKey;
pub use flagger::{flag, Confidence, FlaggedCandidate};
pub use report::{check_report, wikis_report, CheckReport, LookupContext, LookupSettings, WikisReport};
pub use surface::{Surface, SurfaceProgress};
pub use traits::{LogFetcher, ProgressSink};
