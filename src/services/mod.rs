//! Services layer for Mesa
//!
//! Business logic coordinating the search gateway, the document store, and
//! the media store.
//!
//! ## Services
//!
//! - **PlaceAggregator**: one canonical record per physical place, with the
//!   per-user contributor map
//! - **ReviewIngestor**: two-phase review submission (media fan-out, then
//!   persist)
//! - **ListManager**: named place lists, favorites, cover photos
//! - **SocialGraph**: follow relationships and profile search

pub mod aggregator;
pub mod lists;
pub mod reviews;
pub mod social;

pub use aggregator::{
    attribute_with_retry, InMemoryPlaceStore, MongoPlaceStore, PlaceAggregator, PlaceStore,
};
pub use lists::{InMemoryListStore, ListManager, ListStore, MongoListStore};
pub use reviews::{
    HttpMediaStore, InMemoryMediaStore, InMemoryReviewStore, MediaStore, MongoReviewStore,
    ReviewDraft, ReviewIngestor, ReviewIngestorConfig, ReviewStore, SubmissionState,
};
pub use social::{InMemorySocialStore, MongoSocialStore, SocialGraph, SocialStore};
