//! HTTP plumbing shared by every resource module: transport, retry,
//! error classification and query parameters.

mod cache;
mod client;
mod error;
mod params;
mod retry;
mod transport;

pub use cache::{CacheStats, CachingTransport};
pub use client::RequestClient;
pub use error::{FORBIDDEN_MESSAGE, RequestError, UNAUTHORIZED_MESSAGE, status_of};
pub use params::{ParamValue, Params};
pub use retry::{BACKOFF_FACTOR, BASE_DELAY, MAX_ATTEMPTS, RetryPolicy, any_request_failure, is_transient};
pub use transport::{HttpRequest, HttpResponse, RequestBody, ReqwestTransport, Transport, TransportError};

#[cfg(test)]
pub use transport::MockTransport;
