//! Occurrence search, single records, downloads and download statistics.

mod downloads;
mod search;
mod single;
mod statistics;

pub use downloads::{CancelOutcome, OccurrenceDownloads, SqlValidation};
pub use search::{OccurrenceQuery, OccurrenceSearch, SuggestField};
pub use single::SingleOccurrence;
pub use statistics::{DownloadStatistics, ExportQuery};
