// Discovery API repository - bridges the transport with the EventRepository trait
use async_trait::async_trait;
use eventscout_api::{
    decode, with_retry_if, EventApiResponse, EventsApiResponse, EventsEndpoint, HttpTransport,
    RetryConfig, Transport, TransportError, DISCOVERY_API_BASE,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::DomainError,
    models::{venue_summary, Event, EventPage, PageMetadata},
    repository::{DomainResult, EventRepository},
    Result,
};

/// EventRepository backed by the discovery API
pub struct DiscoveryRepository {
    transport: Arc<dyn Transport>,
    api_key: String,
    base_url: String,
    retry_config: RetryConfig,
}

impl DiscoveryRepository {
    pub fn new(transport: Arc<dyn Transport>, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            api_key: api_key.into(),
            base_url: DISCOVERY_API_BASE.to_string(),
            retry_config: RetryConfig::default(),
        }
    }

    /// Wire up a real HTTP transport from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let transport = HttpTransport::new().map_err(DomainError::from)?;

        Ok(Self::new(Arc::new(transport), api_key)
            .with_base_url(config.api.base_url.clone())
            .with_retry_config(config.retry.clone()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Send with retries, then decode once
    ///
    /// Only the network part sits inside the retry loop. A payload that
    /// doesn't parse won't parse any better the second time.
    async fn load(&self, endpoint: EventsEndpoint) -> DomainResult<EventPage> {
        let descriptor = endpoint.descriptor_with_base(&self.base_url);
        let transport = Arc::clone(&self.transport);

        let body = with_retry_if(&self.retry_config, TransportError::is_retryable, || {
            let transport = Arc::clone(&transport);
            let descriptor = descriptor.clone();
            async move { transport.send(&descriptor).await }
        })
        .await?;

        let response: EventsApiResponse = decode(&body).map_err(|e| {
            warn!("Failed to decode page {}: {}", endpoint.page(), e);
            e
        })?;

        let page = response_to_page(response);
        debug!(
            "Loaded page {}/{} with {} events",
            page.page_meta.page_number,
            page.page_meta.total_pages,
            page.events.len()
        );

        Ok(page)
    }
}

#[async_trait]
impl EventRepository for DiscoveryRepository {
    async fn fetch_page(&self, page: u32) -> DomainResult<EventPage> {
        self.load(EventsEndpoint::Events {
            page,
            api_key: self.api_key.clone(),
        })
        .await
    }

    async fn search_page(&self, query: &str, page: u32) -> DomainResult<EventPage> {
        self.load(EventsEndpoint::SearchEvents {
            query: query.to_string(),
            page,
            api_key: self.api_key.clone(),
        })
        .await
    }
}

fn response_to_page(response: EventsApiResponse) -> EventPage {
    let page = response.page;

    EventPage {
        events: response.embedded.events.into_iter().map(api_to_event).collect(),
        page_meta: PageMetadata {
            page_number: page.number,
            page_size: page.size,
            total_elements: page.total_elements,
            total_pages: page.total_pages,
        },
    }
}

/// Convert the API's event to our internal Event model
fn api_to_event(api: EventApiResponse) -> Event {
    // Only the first venue makes it onto the tile
    let venue = api.embedded.and_then(|e| e.venues.into_iter().next());
    let summary = match &venue {
        Some(v) => venue_summary(
            v.name.as_deref(),
            v.address.as_ref().and_then(|a| a.line1.as_deref()),
            v.state.as_ref().and_then(|s| s.name.as_deref()),
            v.country.as_ref().and_then(|c| c.name.as_deref()),
        ),
        None => venue_summary(None, None, None, None),
    };

    let start_date_local = api
        .dates
        .and_then(|d| d.start)
        .and_then(|s| s.local_date)
        .unwrap_or_default();

    Event {
        id: api.id,
        name: api.name.unwrap_or_default(),
        primary_image_url: api.images.into_iter().next().and_then(|img| img.url),
        venue_summary: summary,
        start_date_local,
        url: api.url,
        is_test: api.test.unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventscout_api::EndpointDescriptor;
    use mockall::{mock, Sequence};

    mock! {
        pub Transport {}

        #[async_trait]
        impl Transport for Transport {
            async fn send(
                &self,
                endpoint: &EndpointDescriptor,
            ) -> eventscout_api::transport::Result<Vec<u8>>;
        }
    }

    fn page_json(ids: &[&str], number: u32, total_pages: u32) -> Vec<u8> {
        let events: Vec<String> = ids
            .iter()
            .map(|id| format!(r#"{{"id": "{}", "name": "Event {}"}}"#, id, id))
            .collect();
        format!(
            r#"{{"_embedded": {{"events": [{}]}}, "page": {{"size": 20, "totalElements": {}, "totalPages": {}, "number": {}}}}}"#,
            events.join(","),
            ids.len(),
            total_pages,
            number
        )
        .into_bytes()
    }

    fn repository(transport: MockTransport) -> DiscoveryRepository {
        DiscoveryRepository::new(Arc::new(transport), "test-key")
            .with_retry_config(RetryConfig::immediate(2))
    }

    #[tokio::test]
    async fn test_fetch_page_builds_events_request() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|d| {
                d.path == "events"
                    && d.query_param("page") == Some("1")
                    && d.query_param("apikey") == Some("test-key")
                    && d.query_param("keyword").is_none()
            })
            .times(1)
            .returning(|_| Ok(page_json(&["A", "B"], 1, 3)));

        let page = repository(transport).fetch_page(1).await.unwrap();

        assert_eq!(page.events, vec![Event::new("A", ""), Event::new("B", "")]);
        assert_eq!(page.events[0].name, "Event A");
        assert_eq!(page.page_meta.page_number, 1);
        assert_eq!(page.page_meta.total_pages, 3);
    }

    #[tokio::test]
    async fn test_search_page_sends_keyword() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|d| {
                d.query_param("keyword") == Some("Disney") && d.query_param("page") == Some("0")
            })
            .times(1)
            .returning(|_| Ok(page_json(&["D"], 0, 1)));

        let page = repository(transport).search_page("Disney", 0).await.unwrap();
        assert_eq!(page.events.len(), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_retry_twice_then_surface() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(3)
            .returning(|_| Err(TransportError::Failed("connection reset".into())));

        let result = repository(transport).fetch_page(0).await;
        assert_eq!(result, Err(DomainError::Failed("connection reset".into())));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_a_flaky_call() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(TransportError::BadRequest));
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page_json(&["A"], 0, 1)));

        let page = repository(transport).fetch_page(0).await.unwrap();
        assert_eq!(page.events.len(), 1);
    }

    #[tokio::test]
    async fn test_decode_failure_is_not_retried() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(b"<html>maintenance</html>".to_vec()));

        let result = repository(transport).fetch_page(0).await;
        assert!(matches!(result, Err(DomainError::UnableToDecode(_))));
    }

    #[tokio::test]
    async fn test_custom_base_url_is_used() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|d| d.url() == "http://localhost:9999/v2/events")
            .times(1)
            .returning(|_| Ok(page_json(&[], 0, 0)));

        let page = repository(transport)
            .with_base_url("http://localhost:9999/v2/")
            .fetch_page(0)
            .await
            .unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_api_event_mapping() {
        let json = r#"{
            "id": "E1",
            "name": "Jazz Night",
            "url": "https://example.com/e/E1",
            "images": [{"url": "https://img/first.jpg"}, {"url": "https://img/second.jpg"}],
            "dates": {"start": {"localDate": "2024-05-01"}},
            "_embedded": {"venues": [
                {"name": "Blue Room", "state": {"name": "Missouri"}, "country": {"name": "USA"}},
                {"name": "Ignored Venue"}
            ]}
        }"#;
        let api: EventApiResponse = serde_json::from_str(json).unwrap();

        let event = api_to_event(api);

        assert_eq!(event.id, "E1");
        assert_eq!(event.name, "Jazz Night");
        assert_eq!(event.primary_image_url.as_deref(), Some("https://img/first.jpg"));
        assert_eq!(event.venue_summary, "Blue Room, , Missouri, USA");
        assert_eq!(event.start_date_local, "2024-05-01");
        assert!(!event.is_test);
    }

    #[test]
    fn test_bare_event_mapping() {
        let api: EventApiResponse = serde_json::from_str(r#"{"id": "bare"}"#).unwrap();

        let event = api_to_event(api);

        assert_eq!(event.name, "");
        assert_eq!(event.primary_image_url, None);
        assert_eq!(event.venue_summary, ", , , ");
        assert_eq!(event.start_date_local, "");
    }
}
