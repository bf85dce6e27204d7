//! Follow relationship document schema
//!
//! Each relationship is written twice, once per query direction
//! (`following` keyed by follower, `followers` keyed by followee), mirroring
//! the source system's two collections.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Outgoing relationships, keyed by follower
pub const FOLLOWING_COLLECTION: &str = "following";

/// Incoming relationships, keyed by followee
pub const FOLLOWERS_COLLECTION: &str = "followers";

/// Follow relationship document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FollowDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub follower_id: String,
    pub following_id: String,
    pub followed_at: DateTime,
}

impl FollowDoc {
    pub fn new(follower_id: &str, following_id: &str) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            followed_at: DateTime::now(),
        }
    }
}

impl Default for FollowDoc {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl IntoIndexes for FollowDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "follower_id": 1, "following_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("follower_following_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for FollowDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
