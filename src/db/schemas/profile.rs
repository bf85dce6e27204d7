//! User profile document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for profiles
pub const PROFILE_COLLECTION: &str = "profiles";

/// User profile document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProfileDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// User identifier
    pub user_id: String,

    pub first_name: String,
    pub last_name: String,
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Display form, "First Last"
    pub full_name: String,

    /// Lowercased full name, precomputed for prefix search
    pub full_name_lower: String,
}

impl ProfileDoc {
    pub fn new(user_id: &str, first_name: &str, last_name: &str, email: &str) -> Self {
        let full_name = format!("{} {}", first_name, last_name);
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id: user_id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            profile_photo_url: None,
            phone_number: None,
            full_name_lower: full_name.to_lowercase(),
            full_name,
        }
    }
}

impl IntoIndexes for ProfileDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            // Prefix search over full name
            (
                doc! { "full_name_lower": 1 },
                Some(
                    IndexOptions::builder()
                        .name("full_name_lower_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ProfileDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
