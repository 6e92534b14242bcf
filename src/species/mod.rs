//! Species names: parsing, search and matching against the backbone taxonomy.

mod parser;
mod search;

pub use parser::NameParser;
pub use search::{NameMatch, NameSearch, NameUsageQuery, SpeciesQuery};
