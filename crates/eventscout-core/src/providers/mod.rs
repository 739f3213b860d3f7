// Repository implementations for the event sources we can talk to
pub mod discovery;

pub use discovery::DiscoveryRepository;
