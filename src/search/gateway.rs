//! Search gateway
//!
//! Thin pass-through to the external place-search provider. Suggestions from
//! a `suggest` call are held in a session cache so that `resolve` can turn a
//! selected suggestion into a full place candidate without a second round
//! trip.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::db::schemas::Coordinate;
use crate::search::client::{Suggestion, SuggestionProvider};
use crate::search::session::SuggestionCache;
use crate::types::{MesaError, Result};

/// A fully-resolved candidate for a canonical place.
///
/// Produced by `resolve` and fed to the aggregator's `find_or_create`.
/// Optional metadata is absent when the provider's suggestion shape does not
/// carry it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceCandidate {
    /// Provider-supplied external identifier
    pub external_id: String,
    pub name: String,
    pub address: String,
    pub coordinate: Coordinate,
    /// Which upstream backend produced the candidate
    pub source: String,

    pub categories: Vec<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub open_hours: Option<Vec<String>>,
    pub price_level: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
}

impl From<Suggestion> for PlaceCandidate {
    fn from(s: Suggestion) -> Self {
        Self {
            external_id: s.id,
            name: s.name,
            address: s.address,
            coordinate: Coordinate {
                latitude: s.location.latitude,
                longitude: s.location.longitude,
            },
            source: s.source,
            ..Default::default()
        }
    }
}

/// Gateway over a suggestion provider with a session-scoped resolve cache
pub struct SearchGateway<P: SuggestionProvider> {
    provider: Arc<P>,
    cache: SuggestionCache,
}

impl<P: SuggestionProvider> SearchGateway<P> {
    pub fn new(provider: Arc<P>, suggestion_ttl: Duration) -> Self {
        Self {
            provider,
            cache: SuggestionCache::new(suggestion_ttl),
        }
    }

    /// Fetch ranked suggestions for a query.
    ///
    /// Blank queries short-circuit to an empty result without touching the
    /// provider. Returned suggestions are cached for `resolve`; never more
    /// than `limit` are returned even if the provider over-delivers.
    pub async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut suggestions = self.provider.suggest(query, limit).await?;
        suggestions.truncate(limit);

        self.cache.insert_all(&suggestions);
        debug!(query = %query, count = suggestions.len(), "Cached suggestions");

        Ok(suggestions)
    }

    /// Resolve a previously suggested id into a place candidate.
    ///
    /// Only suggestions surfaced by this session's `suggest` calls (and not
    /// yet expired) are resolvable.
    pub fn resolve(&self, suggestion_id: &str) -> Result<PlaceCandidate> {
        self.cache
            .get(suggestion_id)
            .map(PlaceCandidate::from)
            .ok_or_else(|| {
                MesaError::NotFound(format!(
                    "suggestion '{}' is unknown to this session",
                    suggestion_id
                ))
            })
    }
}
