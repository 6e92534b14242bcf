//! Registry: datasets and the GRSciColl institutions and collections.

mod datasets;
mod grscicoll;

pub use datasets::{DatasetListQuery, DatasetQuery, Datasets};
pub use grscicoll::{Collections, GrSciCollQuery, Institutions};
