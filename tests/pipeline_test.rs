//! End-to-end pipeline integration tests over in-memory backends
//!
//! Exercises the full flow a client drives: search suggestion -> resolve ->
//! canonical place -> list membership / favorite / review submission.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use mesa::db::schemas::{ContributionType, Rating};
use mesa::search::{Location, SearchGateway, Suggestion, SuggestionProvider};
use mesa::services::{
    InMemoryListStore, InMemoryMediaStore, InMemoryPlaceStore, InMemoryReviewStore, ListManager,
    PlaceAggregator, ReviewDraft, ReviewIngestor, ReviewIngestorConfig, ReviewStore,
};
use mesa::{MesaError, Result};

/// Canned provider standing in for the search backend
struct CannedProvider;

#[async_trait::async_trait]
impl SuggestionProvider for CannedProvider {
    async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>> {
        let all = vec![
            Suggestion {
                id: "mesa-busybee".to_string(),
                name: "Busy Bee Cafe".to_string(),
                address: "810 M.L.K. Jr Dr SW, Atlanta, GA".to_string(),
                location: Location {
                    latitude: 33.7532,
                    longitude: -84.4176,
                },
                source: "mesa".to_string(),
            },
            Suggestion {
                id: "mapbox-busybee".to_string(),
                name: "Busy Bee Cafe".to_string(),
                address: "810 Martin Luther King Jr Dr SW".to_string(),
                location: Location {
                    latitude: 33.75321,
                    longitude: -84.41758,
                },
                source: "mapbox".to_string(),
            },
        ];

        Ok(all
            .into_iter()
            .filter(|s| s.name.to_lowercase().contains(&query.to_lowercase()))
            .take(limit)
            .collect())
    }
}

struct Stack {
    gateway: SearchGateway<CannedProvider>,
    aggregator: Arc<PlaceAggregator<InMemoryPlaceStore>>,
    lists: ListManager<InMemoryListStore, InMemoryPlaceStore, InMemoryMediaStore>,
    reviews: ReviewIngestor<InMemoryMediaStore, InMemoryReviewStore>,
    review_store: Arc<InMemoryReviewStore>,
    media: Arc<InMemoryMediaStore>,
}

fn stack() -> Stack {
    let gateway = SearchGateway::new(Arc::new(CannedProvider), Duration::from_secs(60));
    let aggregator = Arc::new(PlaceAggregator::new(Arc::new(InMemoryPlaceStore::new())));
    let media = Arc::new(InMemoryMediaStore::new());
    let review_store = Arc::new(InMemoryReviewStore::new());

    let lists = ListManager::new(
        Arc::new(InMemoryListStore::new()),
        Arc::clone(&aggregator),
        Arc::clone(&media),
    );
    let reviews = ReviewIngestor::new(
        ReviewIngestorConfig::default(),
        Arc::clone(&media),
        Arc::clone(&review_store),
    );

    Stack {
        gateway,
        aggregator,
        lists,
        reviews,
        review_store,
        media,
    }
}

fn draft_for(place_id: &str, place_name: &str) -> ReviewDraft {
    ReviewDraft {
        place_id: place_id.to_string(),
        place_name: place_name.to_string(),
        user_id: "alice".to_string(),
        user_first_name: "Alice".to_string(),
        user_last_name: "Example".to_string(),
        profile_photo_url: "mem://avatars/alice.jpg".to_string(),
        food_rating: Rating::new(5.0).unwrap(),
        service_rating: Rating::new(4.0).unwrap(),
        ambience_rating: Rating::new(4.5).unwrap(),
        favorite_dishes: vec!["fried chicken".to_string()],
        review_text: "Worth the wait.".to_string(),
    }
}

#[tokio::test]
async fn search_to_list_membership() {
    let s = stack();

    let suggestions = s.gateway.suggest("busy bee", 5).await.unwrap();
    assert!(!suggestions.is_empty());
    assert!(suggestions.iter().all(|sg| !sg.id.is_empty()));

    let candidate = s.gateway.resolve(&suggestions[0].id).unwrap();
    let place = s.aggregator.find_or_create(&candidate).await.unwrap();

    s.lists.create_list("alice", "atlanta eats").await.unwrap();
    s.lists
        .add_place("alice", "atlanta eats", &place)
        .await
        .unwrap();

    let list = s.lists.fetch_list("alice", "atlanta eats").await.unwrap();
    assert_eq!(list.places.len(), 1);
    assert_eq!(list.places[0].name, "Busy Bee Cafe");

    let canonical = s.aggregator.get(&place.place_id).await.unwrap();
    assert_eq!(
        canonical.added_by["alice"].contribution,
        ContributionType::List
    );
}

#[tokio::test]
async fn two_providers_one_canonical_place() {
    let s = stack();

    s.gateway.suggest("busy bee", 5).await.unwrap();

    let via_mesa = s.gateway.resolve("mesa-busybee").unwrap();
    let via_mapbox = s.gateway.resolve("mapbox-busybee").unwrap();

    let first = s.aggregator.find_or_create(&via_mesa).await.unwrap();
    let second = s.aggregator.find_or_create(&via_mapbox).await.unwrap();

    // Same physical place from two providers collapses to one record
    assert_eq!(first.place_id, second.place_id);
}

#[tokio::test]
async fn review_submission_references_canonical_place() {
    let s = stack();

    s.gateway.suggest("busy bee", 5).await.unwrap();
    let candidate = s.gateway.resolve("mesa-busybee").unwrap();
    let place = s.aggregator.find_or_create(&candidate).await.unwrap();

    let images = vec![Bytes::from_static(b"photo-1"), Bytes::from_static(b"photo-2")];
    let saved = s
        .reviews
        .submit_review(draft_for(&place.place_id, &place.name), images)
        .await
        .unwrap();

    assert_eq!(saved.place_id, place.place_id);
    assert_eq!(saved.media_urls.len(), 2);
    assert_eq!(s.media.object_count().await, 2);

    let for_place = s.review_store.list_for_place(&place.place_id).await.unwrap();
    assert_eq!(for_place.len(), 1);
    assert_eq!(for_place[0].review_id, saved.review_id);
}

#[tokio::test]
async fn resolve_requires_a_prior_suggest() {
    let s = stack();

    match s.gateway.resolve("mesa-busybee") {
        Err(MesaError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}
