use async_trait::async_trait;
use reqwest::header::{HeaderValue, CACHE_CONTROL, PRAGMA};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::endpoint::{CachePolicy, EndpointDescriptor, HttpMethod};

/// Every request gives up after this long. Not configurable on purpose.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("EventScout/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Authentication error")]
    AuthenticationError,

    #[error("Bad request")]
    BadRequest,

    #[error("The request is outdated")]
    Outdated,

    #[error("Request failed: {0}")]
    Failed(String),

    #[error("Response returned with no data to decode")]
    NoData,

    #[error("Unable to decode the response: {0}")]
    UnableToDecode(String),
}

impl TransportError {
    /// Everything except a decode failure is worth another shot
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::UnableToDecode(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Failed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Map an HTTP status code onto the error taxonomy
///
/// The ranges are wider than HTTP semantics would suggest (a 404 counts as
/// an authentication error), but that's the contract the rest of the app
/// was built against.
pub fn classify_status(status: u16) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        401..=500 => Err(TransportError::AuthenticationError),
        501..=599 => Err(TransportError::BadRequest),
        600 => Err(TransportError::Outdated),
        other => Err(TransportError::Failed(format!("Unexpected HTTP status {}", other))),
    }
}

/// Turn a finished response into its payload
///
/// Status is checked first; a success with nothing in the body is `NoData`.
pub fn response_payload(status: u16, body: &[u8]) -> Result<Vec<u8>> {
    classify_status(status)?;

    if body.is_empty() {
        return Err(TransportError::NoData);
    }

    Ok(body.to_vec())
}

/// Decode a JSON payload into a typed response
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| TransportError::UnableToDecode(e.to_string()))
}

/// One outbound call per `send`. Dropping the returned future cancels it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: &EndpointDescriptor) -> Result<Vec<u8>>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }

    /// Build the request without sending it
    pub fn build_request(&self, endpoint: &EndpointDescriptor) -> Result<reqwest::Request> {
        let method = match endpoint.method {
            HttpMethod::Get => reqwest::Method::GET,
        };

        let mut request = self
            .client
            .request(method, endpoint.url())
            .query(&endpoint.query_params)
            .timeout(REQUEST_TIMEOUT);

        for (name, value) in &endpoint.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if endpoint.cache_policy == CachePolicy::ReloadIgnoringCache {
            request = request
                .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
                .header(PRAGMA, HeaderValue::from_static("no-cache"));
        }

        Ok(request.build()?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, endpoint: &EndpointDescriptor) -> Result<Vec<u8>> {
        let request = self.build_request(endpoint)?;

        // Don't log the full URL, it carries the API key
        debug!("{} {}", endpoint.method, endpoint.url());

        let response = self.client.execute(request).await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        response_payload(status, &body).map_err(|err| {
            warn!(
                "{} {} failed with status {}: {}",
                endpoint.method,
                endpoint.url(),
                status,
                err
            );
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EventsEndpoint;

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(200), Ok(()));
        assert_eq!(classify_status(204), Ok(()));
        assert_eq!(classify_status(299), Ok(()));

        assert_eq!(classify_status(401), Err(TransportError::AuthenticationError));
        assert_eq!(classify_status(404), Err(TransportError::AuthenticationError));
        assert_eq!(classify_status(500), Err(TransportError::AuthenticationError));

        assert_eq!(classify_status(501), Err(TransportError::BadRequest));
        assert_eq!(classify_status(503), Err(TransportError::BadRequest));
        assert_eq!(classify_status(599), Err(TransportError::BadRequest));

        assert_eq!(classify_status(600), Err(TransportError::Outdated));
    }

    #[test]
    fn test_unlisted_statuses_are_plain_failures() {
        for status in [100, 301, 400, 601] {
            assert!(
                matches!(classify_status(status), Err(TransportError::Failed(_))),
                "status {} should map to Failed",
                status
            );
        }
    }

    #[test]
    fn test_only_decode_failures_skip_retry() {
        assert!(TransportError::AuthenticationError.is_retryable());
        assert!(TransportError::BadRequest.is_retryable());
        assert!(TransportError::Outdated.is_retryable());
        assert!(TransportError::Failed("timeout".into()).is_retryable());
        assert!(TransportError::NoData.is_retryable());
        assert!(!TransportError::UnableToDecode("eof".into()).is_retryable());
    }

    #[test]
    fn test_empty_success_body_is_no_data() {
        assert_eq!(response_payload(200, b""), Err(TransportError::NoData));
        assert_eq!(response_payload(204, b""), Err(TransportError::NoData));
        assert_eq!(response_payload(200, b"{}"), Ok(b"{}".to_vec()));
    }

    #[test]
    fn test_error_status_wins_over_body() {
        assert_eq!(
            response_payload(401, br#"{"fault": "invalid key"}"#),
            Err(TransportError::AuthenticationError)
        );
        assert_eq!(response_payload(503, b""), Err(TransportError::BadRequest));
    }

    #[test]
    fn test_decode_failure_maps_to_unable_to_decode() {
        let result: Result<serde_json::Value> = decode(b"{not json");
        assert!(matches!(result, Err(TransportError::UnableToDecode(_))));

        let value: serde_json::Value = decode(br#"{"ok": true}"#).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_build_request_bypasses_cache() {
        let transport = HttpTransport::new().unwrap();
        let endpoint = EventsEndpoint::SearchEvents {
            query: "jazz night".to_string(),
            page: 2,
            api_key: "k3y".to_string(),
        };

        let request = transport.build_request(&endpoint.descriptor()).unwrap();

        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/discovery/v2/events");

        let query: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("page".to_string(), "2".to_string())));
        assert!(query.contains(&("keyword".to_string(), "jazz night".to_string())));
        assert!(query.contains(&("apikey".to_string(), "k3y".to_string())));

        assert_eq!(request.headers().get(CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(request.headers().get(PRAGMA).unwrap(), "no-cache");
        assert_eq!(request.timeout(), Some(&REQUEST_TIMEOUT));
    }

    #[test]
    fn test_build_request_applies_custom_headers() {
        let transport = HttpTransport::new().unwrap();
        let mut descriptor = EventsEndpoint::Events {
            page: 0,
            api_key: "k3y".to_string(),
        }
        .descriptor();
        descriptor.headers.push(("X-Trace".to_string(), "abc".to_string()));
        descriptor.cache_policy = CachePolicy::UseProtocolDefault;

        let request = transport.build_request(&descriptor).unwrap();

        assert_eq!(request.headers().get("x-trace").unwrap(), "abc");
        assert!(request.headers().get(CACHE_CONTROL).is_none());
    }
}
