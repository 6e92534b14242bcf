pub mod auth;
pub mod config;
pub mod gbif;
pub mod http;
pub mod literature;
pub mod maps;
pub mod occurrence;
pub mod registry;
pub mod species;
pub mod vocabulary;

pub use auth::{BasicAuth, OAuthConfig};
pub use config::{CacheConfig, ClientConfig};
pub use gbif::{ExportFormat, Gbif};
pub use http::{Params, RequestClient, RequestError, RetryPolicy};
