//! Profile favorite document schema
//!
//! One document per (user, place) pair; a lightweight reference like a list
//! entry, mirrored into the canonical place's contributor map.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for profile favorites
pub const FAVORITE_COLLECTION: &str = "favorites";

/// Favorite place document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FavoriteDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: String,

    /// Canonical place identifier
    pub place_id: String,
    pub name: String,
    pub address: String,
}

impl FavoriteDoc {
    pub fn new(user_id: &str, place_id: &str, name: &str, address: &str) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id: user_id.to_string(),
            place_id: place_id.to_string(),
            name: name.to_string(),
            address: address.to_string(),
        }
    }
}

impl IntoIndexes for FavoriteDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1, "place_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_place_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for FavoriteDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
