// Core business logic lives here - pagination, search and the models they move around
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod providers;
pub mod repository;

pub use config::Config;
pub use controller::{
    ControllerEvent, EventsController, FetchMode, FetchState, SessionSnapshot, Subscription,
    MIN_SEARCH_QUERY_LEN,
};
pub use error::{DomainError, Error, NETWORK_ERROR_MESSAGE};
pub use models::{Event, EventPage, PageMetadata};
pub use providers::DiscoveryRepository;
pub use repository::{DomainResult, EventRepository};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
