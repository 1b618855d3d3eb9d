//! Clients, caches, and wire formats for the external
//! OpenStreetMap-ecosystem services: the spatial-query (Overpass) service,
//! the elevation service, and the reverse-geocoding service.

pub mod cache;
pub mod client;
pub mod query;
pub mod types;

pub use cache::LookupCache;
pub use client::{ApiClient, ClientConfig};
pub use types::RawElement;
