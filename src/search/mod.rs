//! Search gateway layer
//!
//! Pass-through to the external place-search provider plus the
//! session-scoped cache that lets a selected suggestion be resolved without
//! a second round trip.

pub mod client;
pub mod gateway;
pub mod session;

pub use client::{
    HttpSearchClient, Location, SearchClientConfig, SearchResponse, Suggestion, SuggestionProvider,
};
pub use gateway::{PlaceCandidate, SearchGateway};
pub use session::SuggestionCache;
