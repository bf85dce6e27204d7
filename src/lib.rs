//! Mesa - place aggregation and review backend
//!
//! Mesa is the backend core for a location-discovery and social-reviews
//! product. It deduplicates place records contributed by many users into
//! one canonical record per physical place, ingests multi-photo reviews
//! through a two-phase upload-then-persist pipeline, manages per-user named
//! place lists and favorites, and proxies search-as-you-type to an external
//! place-search provider.
//!
//! ## Components
//!
//! - **SearchGateway**: suggestion pass-through with a session resolve cache
//! - **PlaceAggregator**: canonical place dedup and contributor tracking
//! - **ReviewIngestor**: media fan-out then review persistence
//! - **ListManager**: named lists, favorites, cover photos
//! - **SocialGraph**: follow relationships and profile search

pub mod config;
pub mod db;
pub mod logging;
pub mod search;
pub mod services;
pub mod types;

pub use config::Args;
pub use types::{MesaError, Result};
