//! Social graph
//!
//! Follow relationships and profile search. Each follow is written twice,
//! once per query direction, mirroring the source collections; the two
//! writes are sequential and the first failure aborts.

use bson::doc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::db::schemas::{
    FollowDoc, ProfileDoc, FOLLOWERS_COLLECTION, FOLLOWING_COLLECTION, PROFILE_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{MesaError, Result};

// ============================================================================
// Social Store Trait (for dependency injection)
// ============================================================================

/// Storage seam for follow relationships and profiles
#[async_trait::async_trait]
pub trait SocialStore: Send + Sync {
    /// Write the outgoing direction (keyed by follower)
    async fn put_following(&self, follow: FollowDoc) -> Result<()>;

    /// Write the incoming direction (keyed by followee)
    async fn put_follower(&self, follow: FollowDoc) -> Result<()>;

    async fn delete_following(&self, follower_id: &str, following_id: &str) -> Result<()>;

    async fn delete_follower(&self, follower_id: &str, following_id: &str) -> Result<()>;

    async fn following_exists(&self, follower_id: &str, following_id: &str) -> Result<bool>;

    /// Number of followers of a user, from the incoming direction
    async fn follower_count(&self, user_id: &str) -> Result<u64>;

    async fn upsert_profile(&self, profile: ProfileDoc) -> Result<()>;

    /// Case-normalized prefix match over full names
    async fn search_profiles(&self, prefix_lower: &str, limit: usize) -> Result<Vec<ProfileDoc>>;
}

// ============================================================================
// MongoDB-backed store
// ============================================================================

pub struct MongoSocialStore {
    following: MongoCollection<FollowDoc>,
    followers: MongoCollection<FollowDoc>,
    profiles: MongoCollection<ProfileDoc>,
}

impl MongoSocialStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            following: client.collection(FOLLOWING_COLLECTION).await?,
            followers: client.collection(FOLLOWERS_COLLECTION).await?,
            profiles: client.collection(PROFILE_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl SocialStore for MongoSocialStore {
    async fn put_following(&self, follow: FollowDoc) -> Result<()> {
        let filter = doc! {
            "follower_id": &follow.follower_id,
            "following_id": &follow.following_id,
        };
        self.following.replace_upsert(filter, follow).await
    }

    async fn put_follower(&self, follow: FollowDoc) -> Result<()> {
        let filter = doc! {
            "follower_id": &follow.follower_id,
            "following_id": &follow.following_id,
        };
        self.followers.replace_upsert(filter, follow).await
    }

    async fn delete_following(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.following
            .delete_one(doc! { "follower_id": follower_id, "following_id": following_id })
            .await
            .map(|_| ())
    }

    async fn delete_follower(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.followers
            .delete_one(doc! { "follower_id": follower_id, "following_id": following_id })
            .await
            .map(|_| ())
    }

    async fn following_exists(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let found = self
            .following
            .find_one(doc! { "follower_id": follower_id, "following_id": following_id })
            .await?;
        Ok(found.is_some())
    }

    async fn follower_count(&self, user_id: &str) -> Result<u64> {
        self.followers.count(doc! { "following_id": user_id }).await
    }

    async fn upsert_profile(&self, profile: ProfileDoc) -> Result<()> {
        let filter = doc! { "user_id": &profile.user_id };
        self.profiles.replace_upsert(filter, profile).await
    }

    async fn search_profiles(&self, prefix_lower: &str, limit: usize) -> Result<Vec<ProfileDoc>> {
        // Range trick for prefix matching on the indexed lowercase name:
        // [prefix, prefix + U+F8FF] covers every string starting with prefix
        let upper_bound = format!("{}\u{f8ff}", prefix_lower);

        let mut profiles = self
            .profiles
            .find_many(doc! {
                "full_name_lower": { "$gte": prefix_lower, "$lte": upper_bound }
            })
            .await?;

        profiles.truncate(limit);
        Ok(profiles)
    }
}

// ============================================================================
// In-memory store (for testing/local development)
// ============================================================================

/// Simple in-memory social store
pub struct InMemorySocialStore {
    following: Arc<RwLock<HashSet<(String, String)>>>,
    followers: Arc<RwLock<HashSet<(String, String)>>>,
    profiles: Arc<RwLock<HashMap<String, ProfileDoc>>>,
}

impl InMemorySocialStore {
    pub fn new() -> Self {
        Self {
            following: Arc::new(RwLock::new(HashSet::new())),
            followers: Arc::new(RwLock::new(HashSet::new())),
            profiles: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySocialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SocialStore for InMemorySocialStore {
    async fn put_following(&self, follow: FollowDoc) -> Result<()> {
        self.following
            .write()
            .await
            .insert((follow.follower_id, follow.following_id));
        Ok(())
    }

    async fn put_follower(&self, follow: FollowDoc) -> Result<()> {
        self.followers
            .write()
            .await
            .insert((follow.follower_id, follow.following_id));
        Ok(())
    }

    async fn delete_following(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.following
            .write()
            .await
            .remove(&(follower_id.to_string(), following_id.to_string()));
        Ok(())
    }

    async fn delete_follower(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.followers
            .write()
            .await
            .remove(&(follower_id.to_string(), following_id.to_string()));
        Ok(())
    }

    async fn following_exists(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        Ok(self
            .following
            .read()
            .await
            .contains(&(follower_id.to_string(), following_id.to_string())))
    }

    async fn follower_count(&self, user_id: &str) -> Result<u64> {
        Ok(self
            .followers
            .read()
            .await
            .iter()
            .filter(|(_, following)| following.as_str() == user_id)
            .count() as u64)
    }

    async fn upsert_profile(&self, profile: ProfileDoc) -> Result<()> {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
        Ok(())
    }

    async fn search_profiles(&self, prefix_lower: &str, limit: usize) -> Result<Vec<ProfileDoc>> {
        let mut matches: Vec<ProfileDoc> = self
            .profiles
            .read()
            .await
            .values()
            .filter(|p| p.full_name_lower.starts_with(prefix_lower))
            .cloned()
            .collect();

        matches.sort_by(|a, b| a.full_name_lower.cmp(&b.full_name_lower));
        matches.truncate(limit);
        Ok(matches)
    }
}

// ============================================================================
// Social Graph
// ============================================================================

/// Follow and profile-search service
pub struct SocialGraph<S: SocialStore> {
    store: Arc<S>,
}

impl<S: SocialStore> SocialGraph<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Follow a user. Writes both directions sequentially; the first
    /// failure aborts and is propagated.
    pub async fn follow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        if follower_id == following_id {
            return Err(MesaError::BadRequest(
                "a user cannot follow themselves".to_string(),
            ));
        }

        self.store
            .put_following(FollowDoc::new(follower_id, following_id))
            .await?;
        self.store
            .put_follower(FollowDoc::new(follower_id, following_id))
            .await?;

        info!(follower = %follower_id, following = %following_id, "Follow recorded");
        Ok(())
    }

    /// Unfollow a user, deleting both directions sequentially
    pub async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.store
            .delete_following(follower_id, following_id)
            .await?;
        self.store
            .delete_follower(follower_id, following_id)
            .await?;

        info!(follower = %follower_id, following = %following_id, "Follow removed");
        Ok(())
    }

    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.store.following_exists(follower_id, following_id).await
    }

    pub async fn follower_count(&self, user_id: &str) -> Result<u64> {
        self.store.follower_count(user_id).await
    }

    /// Create or update a user profile
    pub async fn save_profile(&self, profile: ProfileDoc) -> Result<()> {
        self.store.upsert_profile(profile).await
    }

    /// Prefix search over user names; blank queries return nothing
    pub async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<ProfileDoc>> {
        let prefix = query.trim().to_lowercase();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        let matches = self.store.search_profiles(&prefix, limit).await?;
        debug!(query = %query, count = matches.len(), "Profile search");
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> SocialGraph<InMemorySocialStore> {
        SocialGraph::new(Arc::new(InMemorySocialStore::new()))
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let social = graph();

        social.follow("alice", "bob").await.unwrap();
        assert!(social.is_following("alice", "bob").await.unwrap());
        assert!(!social.is_following("bob", "alice").await.unwrap());
        assert_eq!(social.follower_count("bob").await.unwrap(), 1);

        social.unfollow("alice", "bob").await.unwrap();
        assert!(!social.is_following("alice", "bob").await.unwrap());
        assert_eq!(social.follower_count("bob").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_self_follow_rejected() {
        let social = graph();
        let result = social.follow("alice", "alice").await;
        assert!(matches!(result, Err(MesaError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_follow_is_idempotent() {
        let social = graph();

        social.follow("alice", "bob").await.unwrap();
        social.follow("alice", "bob").await.unwrap();

        assert_eq!(social.follower_count("bob").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_users_prefix_case_insensitive() {
        let social = graph();
        social
            .save_profile(ProfileDoc::new("u1", "Ada", "Lovelace", "ada@example.com"))
            .await
            .unwrap();
        social
            .save_profile(ProfileDoc::new("u2", "Adam", "Smith", "adam@example.com"))
            .await
            .unwrap();
        social
            .save_profile(ProfileDoc::new("u3", "Grace", "Hopper", "grace@example.com"))
            .await
            .unwrap();

        let matches = social.search_users("ADA", 10).await.unwrap();
        assert_eq!(matches.len(), 2);

        let limited = social.search_users("ada", 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        assert!(social.search_users("  ", 10).await.unwrap().is_empty());
    }
}
