//! Request execution plumbing: HTTP transport and outbound pacing.

pub mod http;
pub mod rate_limit;

pub use http::transport::{
    ByteStream, HttpStreamResponse, HttpTransport, HttpTransportRequest, HttpTransportResponse,
    ReqwestTransport,
};
pub use rate_limit::{MinIntervalGate, NoopGate, RateLimitGate};
