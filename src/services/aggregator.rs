//! Place aggregator
//!
//! Deduplicates place records contributed by multiple users and providers
//! into one canonical document per physical place, and maintains the
//! per-user contributor map embedded in that document.
//!
//! The contributor map is the only multi-writer resource in the system.
//! Updates to it are read-modify-write guarded by the document version:
//! a concurrent writer surfaces as `StaleWrite`, which the caller retries
//! from a fresh read. Removal of a single user's record is a partial-field
//! update and needs no version guard.

use bson::doc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::schemas::{dedup_key, ContributorRecord, PlaceDoc, PLACE_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::search::PlaceCandidate;
use crate::types::{MesaError, Result};

// ============================================================================
// Place Store Trait (for dependency injection)
// ============================================================================

/// Storage seam for canonical places (allows in-memory backends in tests)
#[async_trait::async_trait]
pub trait PlaceStore: Send + Sync {
    /// Look up by a provider-supplied external identifier
    async fn find_by_provider_id(&self, external_id: &str) -> Result<Option<PlaceDoc>>;

    /// Look up by the normalized name+coordinate dedup key
    async fn find_by_dedup_key(&self, key: &str) -> Result<Option<PlaceDoc>>;

    /// Look up by canonical place identifier
    async fn find_by_place_id(&self, place_id: &str) -> Result<Option<PlaceDoc>>;

    /// Insert a new canonical place; duplicate keys are a `Database` error
    async fn insert(&self, place: PlaceDoc) -> Result<()>;

    /// Replace a place document iff its stored version still matches
    /// `expected_version`, otherwise `StaleWrite`
    async fn replace_versioned(
        &self,
        place_id: &str,
        expected_version: i64,
        place: PlaceDoc,
    ) -> Result<()>;

    /// Remove exactly one user's contributor record (partial-field update)
    async fn remove_contributor(&self, place_id: &str, user_id: &str) -> Result<()>;
}

// ============================================================================
// MongoDB-backed store
// ============================================================================

/// Production place store over the `places` collection
pub struct MongoPlaceStore {
    collection: MongoCollection<PlaceDoc>,
}

impl MongoPlaceStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: client.collection(PLACE_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl PlaceStore for MongoPlaceStore {
    async fn find_by_provider_id(&self, external_id: &str) -> Result<Option<PlaceDoc>> {
        self.collection
            .find_one(doc! { "provider_ids": external_id })
            .await
    }

    async fn find_by_dedup_key(&self, key: &str) -> Result<Option<PlaceDoc>> {
        self.collection.find_one(doc! { "dedup_key": key }).await
    }

    async fn find_by_place_id(&self, place_id: &str) -> Result<Option<PlaceDoc>> {
        self.collection.find_one(doc! { "place_id": place_id }).await
    }

    async fn insert(&self, place: PlaceDoc) -> Result<()> {
        self.collection.insert_one(place).await.map(|_| ())
    }

    async fn replace_versioned(
        &self,
        place_id: &str,
        expected_version: i64,
        place: PlaceDoc,
    ) -> Result<()> {
        self.collection
            .replace_one_versioned(doc! { "place_id": place_id }, expected_version, place)
            .await
    }

    async fn remove_contributor(&self, place_id: &str, user_id: &str) -> Result<()> {
        self.collection
            .update_one(
                doc! { "place_id": place_id },
                doc! {
                    "$unset": { format!("added_by.{}", user_id): "" },
                    "$inc": { "version": 1 },
                },
            )
            .await
            .map(|_| ())
    }
}

// ============================================================================
// In-memory store (for testing/local development)
// ============================================================================

/// Simple in-memory place store, keyed by canonical place id
pub struct InMemoryPlaceStore {
    docs: Arc<RwLock<HashMap<String, PlaceDoc>>>,
}

impl InMemoryPlaceStore {
    pub fn new() -> Self {
        Self {
            docs: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryPlaceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PlaceStore for InMemoryPlaceStore {
    async fn find_by_provider_id(&self, external_id: &str) -> Result<Option<PlaceDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .values()
            .find(|p| p.provider_ids.iter().any(|id| id == external_id))
            .cloned())
    }

    async fn find_by_dedup_key(&self, key: &str) -> Result<Option<PlaceDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .values()
            .find(|p| p.dedup_key == key)
            .cloned())
    }

    async fn find_by_place_id(&self, place_id: &str) -> Result<Option<PlaceDoc>> {
        Ok(self.docs.read().await.get(place_id).cloned())
    }

    async fn insert(&self, place: PlaceDoc) -> Result<()> {
        let mut docs = self.docs.write().await;

        if docs.contains_key(&place.place_id)
            || docs.values().any(|p| p.dedup_key == place.dedup_key)
        {
            return Err(MesaError::Database(format!(
                "duplicate key for place '{}'",
                place.place_id
            )));
        }

        docs.insert(place.place_id.clone(), place);
        Ok(())
    }

    async fn replace_versioned(
        &self,
        place_id: &str,
        expected_version: i64,
        place: PlaceDoc,
    ) -> Result<()> {
        let mut docs = self.docs.write().await;

        match docs.get(place_id) {
            Some(existing) if existing.version == expected_version => {
                docs.insert(place_id.to_string(), place);
                Ok(())
            }
            Some(_) => Err(MesaError::StaleWrite(format!(
                "place '{}' changed since version {}",
                place_id, expected_version
            ))),
            None => Err(MesaError::NotFound(format!("place '{}'", place_id))),
        }
    }

    async fn remove_contributor(&self, place_id: &str, user_id: &str) -> Result<()> {
        let mut docs = self.docs.write().await;

        if let Some(place) = docs.get_mut(place_id) {
            place.added_by.remove(user_id);
            place.version += 1;
        }
        Ok(())
    }
}

// ============================================================================
// Place Aggregator
// ============================================================================

/// Canonical place aggregation service
pub struct PlaceAggregator<S: PlaceStore> {
    store: Arc<S>,
}

impl<S: PlaceStore> PlaceAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Find the canonical place for a resolved candidate, creating it on
    /// first reference.
    ///
    /// Lookup order: provider-supplied external id, then the normalized
    /// name+coordinate dedup key (so two providers describing the same place
    /// collapse into one record), then insert. An insert that loses a create
    /// race falls back to re-reading the winner.
    pub async fn find_or_create(&self, candidate: &PlaceCandidate) -> Result<PlaceDoc> {
        if let Some(place) = self.store.find_by_provider_id(&candidate.external_id).await? {
            debug!(place_id = %place.place_id, "Known provider id");
            return Ok(place);
        }

        let key = dedup_key(&candidate.name, &candidate.coordinate);

        if let Some(place) = self.store.find_by_dedup_key(&key).await? {
            debug!(place_id = %place.place_id, "Matched by dedup key");
            return self.register_alias(place, &candidate.external_id).await;
        }

        let place = PlaceDoc {
            place_id: Uuid::new_v4().to_string(),
            provider_ids: vec![candidate.external_id.clone()],
            dedup_key: key.clone(),
            name: candidate.name.clone(),
            address: candidate.address.clone(),
            coordinate: candidate.coordinate,
            categories: candidate.categories.clone(),
            phone: candidate.phone.clone(),
            website: candidate.website.clone(),
            open_hours: candidate.open_hours.clone(),
            price_level: candidate.price_level.clone(),
            instagram: candidate.instagram.clone(),
            twitter: candidate.twitter.clone(),
            ..Default::default()
        };

        match self.store.insert(place.clone()).await {
            Ok(()) => {
                info!(place_id = %place.place_id, name = %place.name, "Created canonical place");
                Ok(place)
            }
            Err(MesaError::Database(_)) => {
                // Lost a create race; the unique dedup index kept the
                // invariant, so adopt the winner.
                self.store.find_by_dedup_key(&key).await?.ok_or_else(|| {
                    MesaError::Internal(format!("insert failed but no place for key '{}'", key))
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Record the candidate's external id as an alias of an existing place.
    ///
    /// Best-effort: alias registration losing a concurrent update is logged
    /// and skipped, the canonical record is returned either way.
    async fn register_alias(&self, mut place: PlaceDoc, external_id: &str) -> Result<PlaceDoc> {
        if place.provider_ids.iter().any(|id| id == external_id) {
            return Ok(place);
        }

        let expected_version = place.version;
        place.provider_ids.push(external_id.to_string());
        place.version += 1;

        match self
            .store
            .replace_versioned(&place.place_id, expected_version, place.clone())
            .await
        {
            Ok(()) => Ok(place),
            Err(MesaError::StaleWrite(_)) => {
                warn!(
                    place_id = %place.place_id,
                    external_id = %external_id,
                    "Skipped alias registration after concurrent update"
                );
                place.provider_ids.pop();
                place.version -= 1;
                Ok(place)
            }
            Err(e) => Err(e),
        }
    }

    /// Upsert one user's contributor record on a place.
    ///
    /// Last write wins per user; records of other users are untouched. A
    /// concurrent writer to the same document surfaces as `StaleWrite` and
    /// must be retried by the caller from a fresh read.
    pub async fn attribute(
        &self,
        user_id: &str,
        place_id: &str,
        record: ContributorRecord,
    ) -> Result<()> {
        let mut place = self
            .store
            .find_by_place_id(place_id)
            .await?
            .ok_or_else(|| MesaError::NotFound(format!("place '{}'", place_id)))?;

        let expected_version = place.version;
        place.added_by.insert(user_id.to_string(), record);
        place.version += 1;

        self.store
            .replace_versioned(place_id, expected_version, place)
            .await
    }

    /// Remove exactly the calling user's contributor record.
    ///
    /// Never deletes the canonical place, even when the map empties; latent
    /// references (list entries, reviews) may still point at it.
    pub async fn unattribute(&self, user_id: &str, place_id: &str) -> Result<()> {
        self.store.remove_contributor(place_id, user_id).await?;
        debug!(user_id = %user_id, place_id = %place_id, "Removed contributor record");
        Ok(())
    }

    /// Fetch a canonical place by id
    pub async fn get(&self, place_id: &str) -> Result<PlaceDoc> {
        self.store
            .find_by_place_id(place_id)
            .await?
            .ok_or_else(|| MesaError::NotFound(format!("place '{}'", place_id)))
    }
}

/// Retry an attribution until it lands or `max_attempts` stale reads in a
/// row.
///
/// Convenience for callers honoring the retry-on-`StaleWrite` contract.
pub async fn attribute_with_retry<S: PlaceStore>(
    aggregator: &PlaceAggregator<S>,
    user_id: &str,
    place_id: &str,
    record: ContributorRecord,
    max_attempts: usize,
) -> Result<()> {
    let mut last_err = None;

    for attempt in 0..max_attempts {
        match aggregator.attribute(user_id, place_id, record.clone()).await {
            Err(MesaError::StaleWrite(msg)) => {
                debug!(attempt, user_id = %user_id, "Retrying stale attribution");
                last_err = Some(MesaError::StaleWrite(msg));
            }
            other => return other,
        }
    }

    Err(last_err.unwrap_or_else(|| {
        MesaError::Internal("attribute_with_retry called with zero attempts".to_string())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Coordinate;

    fn candidate(external_id: &str, name: &str) -> PlaceCandidate {
        PlaceCandidate {
            external_id: external_id.to_string(),
            name: name.to_string(),
            address: "1 Main St".to_string(),
            coordinate: Coordinate {
                latitude: 33.75,
                longitude: -84.39,
            },
            source: "mesa".to_string(),
            ..Default::default()
        }
    }

    fn aggregator() -> PlaceAggregator<InMemoryPlaceStore> {
        PlaceAggregator::new(Arc::new(InMemoryPlaceStore::new()))
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let agg = aggregator();

        let first = agg.find_or_create(&candidate("ext-1", "Busy Bee Cafe")).await.unwrap();
        let second = agg.find_or_create(&candidate("ext-1", "Busy Bee Cafe")).await.unwrap();

        assert_eq!(first.place_id, second.place_id);
    }

    #[tokio::test]
    async fn test_find_or_create_collapses_providers() {
        let agg = aggregator();

        // Same physical place, two providers with different ids
        let a = agg.find_or_create(&candidate("mesa-1", "Busy Bee Cafe")).await.unwrap();
        let b = agg.find_or_create(&candidate("mapbox-9", "Busy Bee Cafe")).await.unwrap();

        assert_eq!(a.place_id, b.place_id);
        assert!(b.provider_ids.contains(&"mesa-1".to_string()));
        assert!(b.provider_ids.contains(&"mapbox-9".to_string()));

        // The alias now resolves directly
        let c = agg.find_or_create(&candidate("mapbox-9", "Busy Bee Cafe")).await.unwrap();
        assert_eq!(c.place_id, a.place_id);
    }

    #[tokio::test]
    async fn test_attribute_then_unattribute_leaves_no_record() {
        let agg = aggregator();
        let place = agg.find_or_create(&candidate("ext-1", "Busy Bee Cafe")).await.unwrap();

        agg.attribute("alice", &place.place_id, ContributorRecord::favorite())
            .await
            .unwrap();
        agg.attribute("bob", &place.place_id, ContributorRecord::list_member("brunch"))
            .await
            .unwrap();

        agg.unattribute("alice", &place.place_id).await.unwrap();

        let fetched = agg.get(&place.place_id).await.unwrap();
        assert!(!fetched.added_by.contains_key("alice"));
        assert!(fetched.added_by.contains_key("bob"));
    }

    #[tokio::test]
    async fn test_attribute_is_last_write_wins_per_user() {
        let agg = aggregator();
        let place = agg.find_or_create(&candidate("ext-1", "Busy Bee Cafe")).await.unwrap();

        agg.attribute("alice", &place.place_id, ContributorRecord::favorite())
            .await
            .unwrap();
        agg.attribute("alice", &place.place_id, ContributorRecord::list_member("brunch"))
            .await
            .unwrap();

        let fetched = agg.get(&place.place_id).await.unwrap();
        assert_eq!(fetched.added_by.len(), 1);
        assert_eq!(
            fetched.added_by["alice"].list_name.as_deref(),
            Some("brunch")
        );
    }

    #[tokio::test]
    async fn test_stale_write_surfaces() {
        let store = Arc::new(InMemoryPlaceStore::new());
        let agg = PlaceAggregator::new(Arc::clone(&store));
        let place = agg.find_or_create(&candidate("ext-1", "Busy Bee Cafe")).await.unwrap();

        // Read, then let another writer in before writing back
        let stale = agg.get(&place.place_id).await.unwrap();
        agg.attribute("bob", &place.place_id, ContributorRecord::favorite())
            .await
            .unwrap();

        let result = store
            .replace_versioned(&place.place_id, stale.version, stale)
            .await;
        assert!(matches!(result, Err(MesaError::StaleWrite(_))));
    }

    #[tokio::test]
    async fn test_unattribute_never_deletes_the_place() {
        let agg = aggregator();
        let place = agg.find_or_create(&candidate("ext-1", "Busy Bee Cafe")).await.unwrap();

        agg.attribute("alice", &place.place_id, ContributorRecord::favorite())
            .await
            .unwrap();
        agg.unattribute("alice", &place.place_id).await.unwrap();

        let fetched = agg.get(&place.place_id).await.unwrap();
        assert!(fetched.added_by.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_attributions_all_survive() {
        let store = Arc::new(InMemoryPlaceStore::new());
        let agg = Arc::new(PlaceAggregator::new(store));
        let place = agg.find_or_create(&candidate("ext-1", "Busy Bee Cafe")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let agg = Arc::clone(&agg);
            let place_id = place.place_id.clone();
            handles.push(tokio::spawn(async move {
                attribute_with_retry(
                    &agg,
                    &format!("user-{}", i),
                    &place_id,
                    ContributorRecord::favorite(),
                    64,
                )
                .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let fetched = agg.get(&place.place_id).await.unwrap();
        assert_eq!(fetched.added_by.len(), 16);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_optional_fields() {
        let agg = aggregator();

        let mut full = candidate("ext-1", "Busy Bee Cafe");
        full.categories = vec!["southern".to_string(), "cafe".to_string()];
        full.phone = Some("+1-404-555-0150".to_string());
        full.website = Some("https://busybeecafe.example".to_string());
        full.open_hours = Some(vec!["Mon-Fri 11am-7pm".to_string()]);
        full.price_level = Some("$$".to_string());
        full.instagram = Some("@busybee".to_string());
        full.twitter = Some("@busybeecafe".to_string());

        let created = agg.find_or_create(&full).await.unwrap();
        let fetched = agg.get(&created.place_id).await.unwrap();

        assert_eq!(fetched.categories, full.categories);
        assert_eq!(fetched.phone, full.phone);
        assert_eq!(fetched.website, full.website);
        assert_eq!(fetched.open_hours, full.open_hours);
        assert_eq!(fetched.price_level, full.price_level);
        assert_eq!(fetched.instagram, full.instagram);
        assert_eq!(fetched.twitter, full.twitter);
    }
}
