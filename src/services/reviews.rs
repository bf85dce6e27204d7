//! Review ingestor
//!
//! Two-phase review submission: phase 1 uploads every attached photo to the
//! media store with bounded-concurrency fan-out, phase 2 persists the review
//! document referencing the stored URLs. There is no cross-object
//! transaction; phase 2 runs only after phase 1 fully succeeded, and a
//! failed batch leaves its already-stored objects behind (logged, not
//! rolled back).

use bson::doc;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::schemas::{Metadata, Rating, ReviewDoc, REVIEW_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{MesaError, Result};

// ============================================================================
// Store traits (for dependency injection)
// ============================================================================

/// Object storage for media (allows different backends)
#[async_trait::async_trait]
pub trait MediaStore: Send + Sync {
    /// Store an object under `path` and return its stable retrievable URL
    async fn put(&self, path: &str, data: Bytes) -> Result<String>;
}

/// Storage seam for review documents
#[async_trait::async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert(&self, review: ReviewDoc) -> Result<()>;

    async fn find_by_review_id(&self, review_id: &str) -> Result<Option<ReviewDoc>>;

    /// All reviews for a place
    async fn list_for_place(&self, place_id: &str) -> Result<Vec<ReviewDoc>>;
}

// ============================================================================
// MongoDB-backed review store
// ============================================================================

pub struct MongoReviewStore {
    collection: MongoCollection<ReviewDoc>,
}

impl MongoReviewStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: client.collection(REVIEW_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl ReviewStore for MongoReviewStore {
    async fn insert(&self, review: ReviewDoc) -> Result<()> {
        self.collection.insert_one(review).await.map(|_| ())
    }

    async fn find_by_review_id(&self, review_id: &str) -> Result<Option<ReviewDoc>> {
        self.collection
            .find_one(doc! { "review_id": review_id })
            .await
    }

    async fn list_for_place(&self, place_id: &str) -> Result<Vec<ReviewDoc>> {
        self.collection.find_many(doc! { "place_id": place_id }).await
    }
}

// ============================================================================
// HTTP media store
// ============================================================================

/// Media store over an HTTP object-storage endpoint.
///
/// PUTs object bytes to `{base_url}/{path}`; the same URL is the stable
/// retrieval URL afterwards.
pub struct HttpMediaStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpMediaStore {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| MesaError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl MediaStore for HttpMediaStore {
    async fn put(&self, path: &str, data: Bytes) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .put(&url)
            .body(data)
            .send()
            .await
            .map_err(|e| MesaError::Internal(format!("Media upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MesaError::Internal(format!(
                "Media store returned {} for {}",
                response.status(),
                path
            )));
        }

        Ok(url)
    }
}

// ============================================================================
// In-memory media store (for testing/local development)
// ============================================================================

/// Simple in-memory media store
pub struct InMemoryMediaStore {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }
}

impl Default for InMemoryMediaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn put(&self, path: &str, data: Bytes) -> Result<String> {
        self.objects
            .write()
            .await
            .insert(path.to_string(), data);

        Ok(format!("mem://{}", path))
    }
}

// ============================================================================
// In-memory review store (for testing/local development)
// ============================================================================

pub struct InMemoryReviewStore {
    reviews: Arc<RwLock<HashMap<String, ReviewDoc>>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self {
            reviews: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn count(&self) -> usize {
        self.reviews.read().await.len()
    }
}

impl Default for InMemoryReviewStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn insert(&self, review: ReviewDoc) -> Result<()> {
        self.reviews
            .write()
            .await
            .insert(review.review_id.clone(), review);
        Ok(())
    }

    async fn find_by_review_id(&self, review_id: &str) -> Result<Option<ReviewDoc>> {
        Ok(self.reviews.read().await.get(review_id).cloned())
    }

    async fn list_for_place(&self, place_id: &str) -> Result<Vec<ReviewDoc>> {
        Ok(self
            .reviews
            .read()
            .await
            .values()
            .filter(|r| r.place_id == place_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Submission state machine
// ============================================================================

/// States of one review submission.
///
/// `Draft -> UploadingMedia -> (MediaFailed | MediaComplete) ->
/// (PersistFailed | Persisted)`. The failure states are terminal; there is
/// no retry automation, the caller restarts from a fresh draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Draft,
    UploadingMedia,
    MediaFailed,
    MediaComplete,
    PersistFailed,
    Persisted,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::MediaFailed | Self::PersistFailed | Self::Persisted
        )
    }
}

// ============================================================================
// Review Ingestor
// ============================================================================

/// Draft of a review, before submission assigns it an id and media URLs
#[derive(Debug, Clone)]
pub struct ReviewDraft {
    pub place_id: String,
    pub place_name: String,

    pub user_id: String,
    pub user_first_name: String,
    pub user_last_name: String,
    pub profile_photo_url: String,

    pub food_rating: Rating,
    pub service_rating: Rating,
    pub ambience_rating: Rating,
    pub favorite_dishes: Vec<String>,
    pub review_text: String,
}

/// Configuration for the review ingestor
#[derive(Debug, Clone)]
pub struct ReviewIngestorConfig {
    /// Maximum media uploads in flight for one submission
    pub upload_concurrency: usize,
}

impl Default for ReviewIngestorConfig {
    fn default() -> Self {
        Self {
            upload_concurrency: 4,
        }
    }
}

/// Review submission service
pub struct ReviewIngestor<M: MediaStore, R: ReviewStore> {
    config: ReviewIngestorConfig,
    media: Arc<M>,
    reviews: Arc<R>,
}

impl<M: MediaStore, R: ReviewStore> ReviewIngestor<M, R> {
    pub fn new(config: ReviewIngestorConfig, media: Arc<M>, reviews: Arc<R>) -> Self {
        Self {
            config,
            media,
            reviews,
        }
    }

    /// Phase 1: upload every image for a review, fail-fast on any failure.
    ///
    /// Uploads run concurrently up to the configured bound and complete in
    /// arbitrary order; results are re-sorted by submission index before
    /// returning, so the output is positionally stable. When any image
    /// fails the whole batch fails with an `Upload` error naming the failed
    /// indices; objects already stored by the same batch are not rolled
    /// back.
    pub async fn upload_media(&self, review_id: &str, images: Vec<Bytes>) -> Result<Vec<String>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let total = images.len();
        let uploads = images.into_iter().enumerate().map(|(index, data)| {
            let media = Arc::clone(&self.media);
            let path = format!("reviews/{}/{}.jpg", review_id, Uuid::new_v4());
            async move {
                let outcome = media.put(&path, data).await;
                (index, path, outcome)
            }
        });

        let mut completed = stream::iter(uploads)
            .buffer_unordered(self.config.upload_concurrency)
            .collect::<Vec<_>>()
            .await;
        completed.sort_by_key(|(index, _, _)| *index);

        let mut urls = Vec::with_capacity(total);
        let mut failures = Vec::new();
        let mut stored_paths = Vec::new();

        for (index, path, outcome) in completed {
            match outcome {
                Ok(url) => {
                    stored_paths.push(path);
                    urls.push(url);
                }
                Err(e) => failures.push(format!("image {}: {}", index, e)),
            }
        }

        if !failures.is_empty() {
            // The successful objects stay behind; leave a trail for a
            // future cleanup job.
            warn!(
                review_id = %review_id,
                failed = failures.len(),
                orphaned = stored_paths.len(),
                orphaned_paths = ?stored_paths,
                "Media batch failed; stored objects were not rolled back"
            );
            return Err(MesaError::Upload { failures });
        }

        debug!(review_id = %review_id, count = urls.len(), "Media batch uploaded");
        Ok(urls)
    }

    /// Phase 2: persist a review whose media URLs are already attached
    pub async fn persist(&self, review: ReviewDoc) -> Result<ReviewDoc> {
        self.reviews
            .insert(review.clone())
            .await
            .map_err(|e| MesaError::Persist(e.to_string()))?;

        info!(
            review_id = %review.review_id,
            place_id = %review.place_id,
            media = review.media_urls.len(),
            "Review persisted"
        );
        Ok(review)
    }

    /// Submit a review: upload media, then persist.
    ///
    /// Phase 2 runs only if phase 1 fully succeeded; with no images phase 1
    /// is skipped entirely and the review persists with an empty media list.
    pub async fn submit_review(&self, draft: ReviewDraft, images: Vec<Bytes>) -> Result<ReviewDoc> {
        let review_id = Uuid::new_v4().to_string();
        let mut state = SubmissionState::Draft;
        debug!(review_id = %review_id, state = ?state, "Submission started");

        let media_urls = if images.is_empty() {
            Vec::new()
        } else {
            state = SubmissionState::UploadingMedia;
            debug!(review_id = %review_id, state = ?state, "Uploading media");
            match self.upload_media(&review_id, images).await {
                Ok(urls) => urls,
                Err(e) => {
                    state = SubmissionState::MediaFailed;
                    debug!(review_id = %review_id, state = ?state, "Submission ended");
                    return Err(e);
                }
            }
        };
        state = SubmissionState::MediaComplete;
        debug!(review_id = %review_id, state = ?state, "Media phase complete");

        let review = ReviewDoc {
            metadata: Metadata::new(),
            review_id: review_id.clone(),
            place_id: draft.place_id,
            place_name: draft.place_name,
            user_id: draft.user_id,
            user_first_name: draft.user_first_name,
            user_last_name: draft.user_last_name,
            profile_photo_url: draft.profile_photo_url,
            food_rating: draft.food_rating,
            service_rating: draft.service_rating,
            ambience_rating: draft.ambience_rating,
            favorite_dishes: draft.favorite_dishes,
            review_text: draft.review_text,
            media_urls,
            ..Default::default()
        };

        match self.persist(review).await {
            Ok(saved) => {
                state = SubmissionState::Persisted;
                debug!(review_id = %review_id, state = ?state, "Submission ended");
                Ok(saved)
            }
            Err(e) => {
                state = SubmissionState::PersistFailed;
                debug!(review_id = %review_id, state = ?state, "Submission ended");
                Err(e)
            }
        }
    }
}
