// Endpoint descriptors - everything the transport needs to build one request
use std::fmt;

/// Discovery API base. Both event endpoints hang off this.
pub const DISCOVERY_API_BASE: &str = "https://app.ticketmaster.com/discovery/v2/";

/// Discovery is read-only, so GET is all we ever send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How intermediate caches should treat the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    UseProtocolDefault,
    /// Always go to the origin. Event listings change too often to trust a cache.
    #[default]
    ReloadIgnoringCache,
}

/// A fully resolved request description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub base_url: String,
    pub path: String,
    pub method: HttpMethod,
    pub query_params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub cache_policy: CachePolicy,
}

impl EndpointDescriptor {
    /// Base URL joined with the path, with exactly one slash between them
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    /// Look up a query parameter by name
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The two endpoints the event listing talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventsEndpoint {
    Events {
        page: u32,
        api_key: String,
    },
    SearchEvents {
        query: String,
        page: u32,
        api_key: String,
    },
}

impl EventsEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            EventsEndpoint::Events { .. } | EventsEndpoint::SearchEvents { .. } => "events",
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            EventsEndpoint::Events { page, .. } | EventsEndpoint::SearchEvents { page, .. } => {
                *page
            }
        }
    }

    fn query_params(&self) -> Vec<(String, String)> {
        match self {
            EventsEndpoint::Events { page, api_key } => vec![
                ("page".to_string(), page.to_string()),
                ("apikey".to_string(), api_key.clone()),
            ],
            EventsEndpoint::SearchEvents {
                query,
                page,
                api_key,
            } => vec![
                ("page".to_string(), page.to_string()),
                ("keyword".to_string(), query.clone()),
                ("apikey".to_string(), api_key.clone()),
            ],
        }
    }

    /// Resolve against the default discovery API base
    pub fn descriptor(&self) -> EndpointDescriptor {
        self.descriptor_with_base(DISCOVERY_API_BASE)
    }

    /// Resolve against a custom base URL (staging, local mock server, ...)
    pub fn descriptor_with_base(&self, base_url: &str) -> EndpointDescriptor {
        EndpointDescriptor {
            base_url: base_url.to_string(),
            path: self.path().to_string(),
            method: HttpMethod::Get,
            query_params: self.query_params(),
            headers: Vec::new(),
            cache_policy: CachePolicy::ReloadIgnoringCache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_descriptor() {
        let endpoint = EventsEndpoint::Events {
            page: 3,
            api_key: "secret".to_string(),
        };
        let descriptor = endpoint.descriptor();

        assert_eq!(descriptor.url(), "https://app.ticketmaster.com/discovery/v2/events");
        assert_eq!(descriptor.method, HttpMethod::Get);
        assert_eq!(descriptor.cache_policy, CachePolicy::ReloadIgnoringCache);
        assert_eq!(descriptor.query_param("page"), Some("3"));
        assert_eq!(descriptor.query_param("apikey"), Some("secret"));
        assert_eq!(descriptor.query_param("keyword"), None);
    }

    #[test]
    fn test_search_descriptor_carries_keyword() {
        let endpoint = EventsEndpoint::SearchEvents {
            query: "Disney on Ice".to_string(),
            page: 0,
            api_key: "secret".to_string(),
        };
        let descriptor = endpoint.descriptor_with_base("http://localhost:8080/v2");

        assert_eq!(descriptor.url(), "http://localhost:8080/v2/events");
        assert_eq!(descriptor.query_param("keyword"), Some("Disney on Ice"));
        assert_eq!(descriptor.query_param("page"), Some("0"));
        assert_eq!(endpoint.page(), 0);
    }
}
