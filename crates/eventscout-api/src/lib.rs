// Transport layer for the discovery API - requests out, bytes back
pub mod discovery;
pub mod endpoint;
pub mod retry;
pub mod transport;

// Re-export common types
pub use discovery::{EventApiResponse, EventsApiResponse, PageApiResponse};
pub use endpoint::{
    CachePolicy, EndpointDescriptor, EventsEndpoint, HttpMethod, DISCOVERY_API_BASE,
};
pub use retry::{with_retry_if, RetryConfig};
pub use transport::{
    classify_status, decode, response_payload, HttpTransport, Transport, TransportError,
    REQUEST_TIMEOUT,
};
