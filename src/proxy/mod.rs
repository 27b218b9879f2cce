//! Demo-service proxy
//!
//! Forwards demo provisioning requests to a serverless upstream that may be
//! scaled to zero. One module per concern: a single upstream call, a response
//! classifier, the retry controller that ties them together, and a TTL cache
//! that de-duplicates repeated requests.

pub mod classify;
pub mod dedupe;
pub mod retry;
pub mod upstream;

pub use classify::{classify, Classification};
pub use dedupe::{spawn_dedupe_cleanup_task, RequestCache};
pub use retry::{DemoProxy, ProxyConfig, ProxyResult};
pub use upstream::{HttpUpstream, TransportError, Upstream, UpstreamResponse};
