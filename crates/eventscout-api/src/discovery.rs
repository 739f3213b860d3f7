// Wire models for the discovery API's event listing
//
// The API is generous with fields and stingy with guarantees, so almost
// everything here is optional. Only the event id is load-bearing.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsApiResponse {
    /// Missing entirely when a page has no results
    #[serde(rename = "_embedded", default)]
    pub embedded: EmbeddedApiResponse,
    pub page: PageApiResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddedApiResponse {
    #[serde(default)]
    pub events: Vec<EventApiResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventApiResponse {
    pub id: String,
    pub name: Option<String>,
    pub test: Option<bool>,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageApiResponse>,
    pub dates: Option<DatesApiResponse>,
    #[serde(rename = "_embedded")]
    pub embedded: Option<EventEmbeddedApiResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageApiResponse {
    pub ratio: Option<String>,
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fallback: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatesApiResponse {
    pub start: Option<StartApiResponse>,
    pub timezone: Option<String>,
    pub status: Option<StatusApiResponse>,
    pub span_multiple_days: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartApiResponse {
    pub local_date: Option<String>,
    pub local_time: Option<String>,
    pub date_time: Option<String>,
    #[serde(rename = "dateTBD")]
    pub date_tbd: Option<bool>,
    #[serde(rename = "dateTBA")]
    pub date_tba: Option<bool>,
    #[serde(rename = "timeTBA")]
    pub time_tba: Option<bool>,
    pub no_specific_time: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusApiResponse {
    pub code: Option<String>, // "onsale", "offsale", "cancelled", ...
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventEmbeddedApiResponse {
    #[serde(default)]
    pub venues: Vec<VenueApiResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueApiResponse {
    pub name: Option<String>,
    pub id: Option<String>,
    pub test: Option<bool>,
    pub url: Option<String>,
    pub city: Option<NamedApiResponse>,
    pub state: Option<StateApiResponse>,
    pub country: Option<NamedApiResponse>,
    pub address: Option<AddressApiResponse>,
}

/// City and country are both just `{ "name": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedApiResponse {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateApiResponse {
    pub name: Option<String>,
    pub state_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressApiResponse {
    pub line1: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageApiResponse {
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
}
