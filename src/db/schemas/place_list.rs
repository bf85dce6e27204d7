//! Place list document schema
//!
//! A named, user-owned collection of lightweight place references. The list
//! name doubles as its identifier within the owner's namespace (carried over
//! from the source system; renaming is therefore not supported).

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for place lists
pub const PLACE_LIST_COLLECTION: &str = "placeLists";

/// Lightweight place reference inside a list.
///
/// Not a full canonical place; reconciled against the `places` collection
/// when full detail is needed.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ListEntry {
    /// Canonical place identifier
    pub id: String,
    pub name: String,
    pub address: String,
}

/// Place list document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PlaceListDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub owner_id: String,

    /// List name; unique per owner and used as the list's identifier
    pub name: String,

    /// Cover photo URL, set after an upload to the media store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Ordered entries
    #[serde(default)]
    pub places: Vec<ListEntry>,
}

impl PlaceListDoc {
    /// Create an empty list for a user
    pub fn new(owner_id: &str, name: &str) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            image_url: None,
            places: Vec::new(),
        }
    }
}

impl IntoIndexes for PlaceListDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "owner_id": 1, "name": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("owner_name_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for PlaceListDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
