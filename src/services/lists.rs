//! List manager
//!
//! Per-user named collections of lightweight place references, plus profile
//! favorites. Both mirror their membership into the aggregator's contributor
//! map so the shared map view knows who referenced a place and why.
//!
//! List mutation and contributor-map mirroring are two separate writes with
//! no transaction. On removal the mirror update is best-effort: a crash or
//! failure between the two leaves an orphaned contributor record, which
//! self-heals on the next full reconciliation.

use bson::doc;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::schemas::{
    ContributorRecord, FavoriteDoc, ListEntry, PlaceDoc, PlaceListDoc, FAVORITE_COLLECTION,
    PLACE_LIST_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::services::aggregator::{attribute_with_retry, PlaceAggregator, PlaceStore};
use crate::services::reviews::MediaStore;
use crate::types::{MesaError, Result};

/// Stale-read retries granted to contributor-map mirroring before giving up
const ATTRIBUTE_RETRIES: usize = 8;

// ============================================================================
// List Store Trait (for dependency injection)
// ============================================================================

/// Storage seam for place lists and profile favorites
#[async_trait::async_trait]
pub trait ListStore: Send + Sync {
    /// Write a whole list document, replacing any list of the same name
    async fn upsert_list(&self, list: PlaceListDoc) -> Result<()>;

    async fn fetch_list(&self, owner_id: &str, name: &str) -> Result<Option<PlaceListDoc>>;

    async fn fetch_lists(&self, owner_id: &str) -> Result<Vec<PlaceListDoc>>;

    /// Delete a list; returns whether anything was deleted
    async fn delete_list(&self, owner_id: &str, name: &str) -> Result<bool>;

    /// Append an entry to an existing list; `NotFound` when the list is
    /// missing
    async fn append_entry(&self, owner_id: &str, name: &str, entry: ListEntry) -> Result<()>;

    /// Remove every entry with the given place id from a list
    async fn remove_entry(&self, owner_id: &str, name: &str, place_id: &str) -> Result<()>;

    /// Partial update of a list's cover image URL
    async fn set_image(&self, owner_id: &str, name: &str, url: &str) -> Result<()>;

    async fn upsert_favorite(&self, favorite: FavoriteDoc) -> Result<()>;

    async fn remove_favorite(&self, user_id: &str, place_id: &str) -> Result<()>;

    async fn fetch_favorites(&self, user_id: &str) -> Result<Vec<FavoriteDoc>>;
}

// ============================================================================
// MongoDB-backed store
// ============================================================================

pub struct MongoListStore {
    lists: MongoCollection<PlaceListDoc>,
    favorites: MongoCollection<FavoriteDoc>,
}

impl MongoListStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            lists: client.collection(PLACE_LIST_COLLECTION).await?,
            favorites: client.collection(FAVORITE_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl ListStore for MongoListStore {
    async fn upsert_list(&self, list: PlaceListDoc) -> Result<()> {
        let filter = doc! { "owner_id": &list.owner_id, "name": &list.name };
        self.lists.replace_upsert(filter, list).await
    }

    async fn fetch_list(&self, owner_id: &str, name: &str) -> Result<Option<PlaceListDoc>> {
        self.lists
            .find_one(doc! { "owner_id": owner_id, "name": name })
            .await
    }

    async fn fetch_lists(&self, owner_id: &str) -> Result<Vec<PlaceListDoc>> {
        self.lists.find_many(doc! { "owner_id": owner_id }).await
    }

    async fn delete_list(&self, owner_id: &str, name: &str) -> Result<bool> {
        let deleted = self
            .lists
            .delete_one(doc! { "owner_id": owner_id, "name": name })
            .await?;
        Ok(deleted > 0)
    }

    async fn append_entry(&self, owner_id: &str, name: &str, entry: ListEntry) -> Result<()> {
        let entry_bson = bson::to_bson(&entry)
            .map_err(|e| MesaError::Internal(format!("Failed to encode entry: {}", e)))?;

        let result = self
            .lists
            .update_one(
                doc! { "owner_id": owner_id, "name": name },
                doc! { "$push": { "places": entry_bson } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(MesaError::NotFound(format!("list '{}'", name)));
        }
        Ok(())
    }

    async fn remove_entry(&self, owner_id: &str, name: &str, place_id: &str) -> Result<()> {
        self.lists
            .update_one(
                doc! { "owner_id": owner_id, "name": name },
                doc! { "$pull": { "places": { "id": place_id } } },
            )
            .await
            .map(|_| ())
    }

    async fn set_image(&self, owner_id: &str, name: &str, url: &str) -> Result<()> {
        let result = self
            .lists
            .update_one(
                doc! { "owner_id": owner_id, "name": name },
                doc! { "$set": { "image_url": url } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(MesaError::NotFound(format!("list '{}'", name)));
        }
        Ok(())
    }

    async fn upsert_favorite(&self, favorite: FavoriteDoc) -> Result<()> {
        let filter = doc! { "user_id": &favorite.user_id, "place_id": &favorite.place_id };
        self.favorites.replace_upsert(filter, favorite).await
    }

    async fn remove_favorite(&self, user_id: &str, place_id: &str) -> Result<()> {
        self.favorites
            .delete_one(doc! { "user_id": user_id, "place_id": place_id })
            .await
            .map(|_| ())
    }

    async fn fetch_favorites(&self, user_id: &str) -> Result<Vec<FavoriteDoc>> {
        self.favorites.find_many(doc! { "user_id": user_id }).await
    }
}

// ============================================================================
// In-memory store (for testing/local development)
// ============================================================================

/// Simple in-memory list and favorite store
pub struct InMemoryListStore {
    lists: Arc<RwLock<HashMap<(String, String), PlaceListDoc>>>,
    favorites: Arc<RwLock<HashMap<(String, String), FavoriteDoc>>>,
}

impl InMemoryListStore {
    pub fn new() -> Self {
        Self {
            lists: Arc::new(RwLock::new(HashMap::new())),
            favorites: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryListStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ListStore for InMemoryListStore {
    async fn upsert_list(&self, list: PlaceListDoc) -> Result<()> {
        let key = (list.owner_id.clone(), list.name.clone());
        self.lists.write().await.insert(key, list);
        Ok(())
    }

    async fn fetch_list(&self, owner_id: &str, name: &str) -> Result<Option<PlaceListDoc>> {
        Ok(self
            .lists
            .read()
            .await
            .get(&(owner_id.to_string(), name.to_string()))
            .cloned())
    }

    async fn fetch_lists(&self, owner_id: &str) -> Result<Vec<PlaceListDoc>> {
        Ok(self
            .lists
            .read()
            .await
            .values()
            .filter(|l| l.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete_list(&self, owner_id: &str, name: &str) -> Result<bool> {
        Ok(self
            .lists
            .write()
            .await
            .remove(&(owner_id.to_string(), name.to_string()))
            .is_some())
    }

    async fn append_entry(&self, owner_id: &str, name: &str, entry: ListEntry) -> Result<()> {
        let mut lists = self.lists.write().await;
        let list = lists
            .get_mut(&(owner_id.to_string(), name.to_string()))
            .ok_or_else(|| MesaError::NotFound(format!("list '{}'", name)))?;

        list.places.push(entry);
        Ok(())
    }

    async fn remove_entry(&self, owner_id: &str, name: &str, place_id: &str) -> Result<()> {
        let mut lists = self.lists.write().await;
        if let Some(list) = lists.get_mut(&(owner_id.to_string(), name.to_string())) {
            list.places.retain(|e| e.id != place_id);
        }
        Ok(())
    }

    async fn set_image(&self, owner_id: &str, name: &str, url: &str) -> Result<()> {
        let mut lists = self.lists.write().await;
        let list = lists
            .get_mut(&(owner_id.to_string(), name.to_string()))
            .ok_or_else(|| MesaError::NotFound(format!("list '{}'", name)))?;

        list.image_url = Some(url.to_string());
        Ok(())
    }

    async fn upsert_favorite(&self, favorite: FavoriteDoc) -> Result<()> {
        let key = (favorite.user_id.clone(), favorite.place_id.clone());
        self.favorites.write().await.insert(key, favorite);
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, place_id: &str) -> Result<()> {
        self.favorites
            .write()
            .await
            .remove(&(user_id.to_string(), place_id.to_string()));
        Ok(())
    }

    async fn fetch_favorites(&self, user_id: &str) -> Result<Vec<FavoriteDoc>> {
        Ok(self
            .favorites
            .read()
            .await
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// List Manager
// ============================================================================

/// List and favorite management service
pub struct ListManager<L: ListStore, P: PlaceStore, M: MediaStore> {
    lists: Arc<L>,
    aggregator: Arc<PlaceAggregator<P>>,
    media: Arc<M>,
}

impl<L: ListStore, P: PlaceStore, M: MediaStore> ListManager<L, P, M> {
    pub fn new(lists: Arc<L>, aggregator: Arc<PlaceAggregator<P>>, media: Arc<M>) -> Self {
        Self {
            lists,
            aggregator,
            media,
        }
    }

    /// Create a list, idempotent by name.
    ///
    /// A same-named list is overwritten; the name is the list's identifier
    /// within the owner's namespace, so there is no rename.
    pub async fn create_list(&self, user_id: &str, name: &str) -> Result<()> {
        self.lists
            .upsert_list(PlaceListDoc::new(user_id, name))
            .await?;

        info!(user_id = %user_id, list = %name, "List created");
        Ok(())
    }

    /// Append a place to a list and mirror the membership into the
    /// aggregator's contributor map.
    pub async fn add_place(&self, user_id: &str, list_name: &str, place: &PlaceDoc) -> Result<()> {
        let entry = ListEntry {
            id: place.place_id.clone(),
            name: place.name.clone(),
            address: place.address.clone(),
        };

        self.lists.append_entry(user_id, list_name, entry).await?;

        attribute_with_retry(
            &self.aggregator,
            user_id,
            &place.place_id,
            ContributorRecord::list_member(list_name),
            ATTRIBUTE_RETRIES,
        )
        .await?;

        debug!(user_id = %user_id, list = %list_name, place_id = %place.place_id, "Place added to list");
        Ok(())
    }

    /// Remove a place from a list.
    ///
    /// The contributor-map removal is best-effort: its failure is logged,
    /// not escalated, because the list removal already succeeded and the map
    /// self-heals on the next reconciliation.
    pub async fn remove_place(&self, user_id: &str, list_name: &str, place_id: &str) -> Result<()> {
        self.lists.remove_entry(user_id, list_name, place_id).await?;

        if let Err(e) = self.aggregator.unattribute(user_id, place_id).await {
            warn!(
                user_id = %user_id,
                place_id = %place_id,
                error = %e,
                "Contributor-map removal failed after list removal"
            );
        }

        debug!(user_id = %user_id, list = %list_name, place_id = %place_id, "Place removed from list");
        Ok(())
    }

    /// Fetch one list; `NotFound` when missing
    pub async fn fetch_list(&self, user_id: &str, name: &str) -> Result<PlaceListDoc> {
        self.lists
            .fetch_list(user_id, name)
            .await?
            .ok_or_else(|| MesaError::NotFound(format!("list '{}'", name)))
    }

    /// Fetch all of a user's lists
    pub async fn fetch_lists(&self, user_id: &str) -> Result<Vec<PlaceListDoc>> {
        self.lists.fetch_lists(user_id).await
    }

    /// Delete a list; `NotFound` when missing
    pub async fn delete_list(&self, user_id: &str, name: &str) -> Result<()> {
        if !self.lists.delete_list(user_id, name).await? {
            return Err(MesaError::NotFound(format!("list '{}'", name)));
        }

        info!(user_id = %user_id, list = %name, "List deleted");
        Ok(())
    }

    /// Reconcile a list's lightweight entries against the canonical place
    /// records.
    ///
    /// Fetches run concurrently; entries whose canonical record has gone
    /// missing are logged and skipped. Output order follows the list.
    pub async fn fetch_full_places(&self, user_id: &str, name: &str) -> Result<Vec<PlaceDoc>> {
        let list = self.fetch_list(user_id, name).await?;

        let lookups = list.places.iter().enumerate().map(|(index, entry)| {
            let aggregator = Arc::clone(&self.aggregator);
            let place_id = entry.id.clone();
            async move { (index, aggregator.get(&place_id).await) }
        });

        let mut fetched = stream::iter(lookups)
            .buffer_unordered(8)
            .collect::<Vec<_>>()
            .await;
        fetched.sort_by_key(|(index, _)| *index);

        let mut places = Vec::with_capacity(fetched.len());
        for (index, outcome) in fetched {
            match outcome {
                Ok(place) => places.push(place),
                Err(e) => {
                    warn!(list = %name, index, error = %e, "Skipping unresolvable list entry");
                }
            }
        }

        Ok(places)
    }

    /// Upload a cover photo for a list and record its URL
    pub async fn set_cover_photo(
        &self,
        user_id: &str,
        list_name: &str,
        image: Bytes,
    ) -> Result<String> {
        let path = format!(
            "placeListPhotos/{}/{}/{}",
            user_id,
            list_name,
            Uuid::new_v4()
        );

        let url = self.media.put(&path, image).await?;
        self.lists.set_image(user_id, list_name, &url).await?;

        info!(user_id = %user_id, list = %list_name, "Cover photo updated");
        Ok(url)
    }

    /// Add a place to the user's profile favorites and mirror it into the
    /// contributor map
    pub async fn add_favorite(&self, user_id: &str, place: &PlaceDoc) -> Result<()> {
        self.lists
            .upsert_favorite(FavoriteDoc::new(
                user_id,
                &place.place_id,
                &place.name,
                &place.address,
            ))
            .await?;

        attribute_with_retry(
            &self.aggregator,
            user_id,
            &place.place_id,
            ContributorRecord::favorite(),
            ATTRIBUTE_RETRIES,
        )
        .await?;

        debug!(user_id = %user_id, place_id = %place.place_id, "Favorite added");
        Ok(())
    }

    /// Remove a favorite; the contributor-map removal is best-effort, as in
    /// `remove_place`
    pub async fn remove_favorite(&self, user_id: &str, place_id: &str) -> Result<()> {
        self.lists.remove_favorite(user_id, place_id).await?;

        if let Err(e) = self.aggregator.unattribute(user_id, place_id).await {
            warn!(
                user_id = %user_id,
                place_id = %place_id,
                error = %e,
                "Contributor-map removal failed after favorite removal"
            );
        }

        Ok(())
    }

    /// Fetch the user's profile favorites
    pub async fn fetch_favorites(&self, user_id: &str) -> Result<Vec<FavoriteDoc>> {
        self.lists.fetch_favorites(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{ContributionType, Coordinate};
    use crate::search::PlaceCandidate;
    use crate::services::aggregator::InMemoryPlaceStore;
    use crate::services::reviews::InMemoryMediaStore;

    struct Fixture {
        manager: ListManager<InMemoryListStore, InMemoryPlaceStore, InMemoryMediaStore>,
        aggregator: Arc<PlaceAggregator<InMemoryPlaceStore>>,
        media: Arc<InMemoryMediaStore>,
    }

    fn fixture() -> Fixture {
        let aggregator = Arc::new(PlaceAggregator::new(Arc::new(InMemoryPlaceStore::new())));
        let media = Arc::new(InMemoryMediaStore::new());
        let manager = ListManager::new(
            Arc::new(InMemoryListStore::new()),
            Arc::clone(&aggregator),
            Arc::clone(&media),
        );
        Fixture {
            manager,
            aggregator,
            media,
        }
    }

    async fn seeded_place(aggregator: &PlaceAggregator<InMemoryPlaceStore>) -> PlaceDoc {
        aggregator
            .find_or_create(&PlaceCandidate {
                external_id: "ext-1".to_string(),
                name: "Busy Bee Cafe".to_string(),
                address: "810 M.L.K. Jr Dr SW".to_string(),
                coordinate: Coordinate {
                    latitude: 33.7532,
                    longitude: -84.4176,
                },
                source: "mesa".to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_list_is_idempotent_by_name() {
        let fx = fixture();
        let place = seeded_place(&fx.aggregator).await;

        fx.manager.create_list("alice", "brunch").await.unwrap();
        fx.manager
            .add_place("alice", "brunch", &place)
            .await
            .unwrap();

        // Re-creating the same name overwrites the list
        fx.manager.create_list("alice", "brunch").await.unwrap();

        let list = fx.manager.fetch_list("alice", "brunch").await.unwrap();
        assert!(list.places.is_empty());
    }

    #[tokio::test]
    async fn test_add_place_mirrors_into_contributor_map() {
        let fx = fixture();
        let place = seeded_place(&fx.aggregator).await;

        fx.manager.create_list("alice", "brunch").await.unwrap();
        fx.manager
            .add_place("alice", "brunch", &place)
            .await
            .unwrap();

        let list = fx.manager.fetch_list("alice", "brunch").await.unwrap();
        assert_eq!(list.places.len(), 1);
        assert_eq!(list.places[0].id, place.place_id);

        let canonical = fx.aggregator.get(&place.place_id).await.unwrap();
        let record = &canonical.added_by["alice"];
        assert_eq!(record.contribution, ContributionType::List);
        assert_eq!(record.list_name.as_deref(), Some("brunch"));
    }

    #[tokio::test]
    async fn test_add_place_to_missing_list_is_not_found() {
        let fx = fixture();
        let place = seeded_place(&fx.aggregator).await;

        let result = fx.manager.add_place("alice", "no-such-list", &place).await;
        assert!(matches!(result, Err(MesaError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_place_unattributes() {
        let fx = fixture();
        let place = seeded_place(&fx.aggregator).await;

        fx.manager.create_list("alice", "brunch").await.unwrap();
        fx.manager
            .add_place("alice", "brunch", &place)
            .await
            .unwrap();
        fx.manager
            .remove_place("alice", "brunch", &place.place_id)
            .await
            .unwrap();

        let list = fx.manager.fetch_list("alice", "brunch").await.unwrap();
        assert!(list.places.is_empty());

        let canonical = fx.aggregator.get(&place.place_id).await.unwrap();
        assert!(!canonical.added_by.contains_key("alice"));
    }

    #[tokio::test]
    async fn test_fetch_missing_list_is_not_found() {
        let fx = fixture();
        let result = fx.manager.fetch_list("alice", "nope").await;
        assert!(matches!(result, Err(MesaError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_list_is_not_found() {
        let fx = fixture();
        let result = fx.manager.delete_list("alice", "nope").await;
        assert!(matches!(result, Err(MesaError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_full_places_reconciles_entries() {
        let fx = fixture();
        let place = seeded_place(&fx.aggregator).await;

        fx.manager.create_list("alice", "brunch").await.unwrap();
        fx.manager
            .add_place("alice", "brunch", &place)
            .await
            .unwrap();

        let full = fx
            .manager
            .fetch_full_places("alice", "brunch")
            .await
            .unwrap();
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].place_id, place.place_id);
        assert_eq!(full[0].coordinate, place.coordinate);
    }

    #[tokio::test]
    async fn test_cover_photo_sets_image_url() {
        let fx = fixture();

        fx.manager.create_list("alice", "brunch").await.unwrap();
        let url = fx
            .manager
            .set_cover_photo("alice", "brunch", Bytes::from_static(b"jpeg-bytes"))
            .await
            .unwrap();

        assert_eq!(fx.media.object_count().await, 1);
        let list = fx.manager.fetch_list("alice", "brunch").await.unwrap();
        assert_eq!(list.image_url.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn test_favorites_roundtrip() {
        let fx = fixture();
        let place = seeded_place(&fx.aggregator).await;

        fx.manager.add_favorite("alice", &place).await.unwrap();

        let favorites = fx.manager.fetch_favorites("alice").await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].place_id, place.place_id);

        let canonical = fx.aggregator.get(&place.place_id).await.unwrap();
        assert_eq!(
            canonical.added_by["alice"].contribution,
            ContributionType::Favorite
        );

        fx.manager
            .remove_favorite("alice", &place.place_id)
            .await
            .unwrap();
        assert!(fx.manager.fetch_favorites("alice").await.unwrap().is_empty());

        let canonical = fx.aggregator.get(&place.place_id).await.unwrap();
        assert!(canonical.added_by.is_empty());
    }
}
