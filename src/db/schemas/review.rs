//! Review document schema
//!
//! Reviews are immutable once persisted. `media_urls` is only ever populated
//! after every attached photo upload succeeded; a review is never written
//! with a partially-uploaded media set.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::{MesaError, Result};

/// Collection name for reviews
pub const REVIEW_COLLECTION: &str = "reviews";

/// A rating bounded to 0.0..=5.0
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct Rating(f64);

impl Rating {
    pub fn new(value: f64) -> Result<Self> {
        if !(0.0..=5.0).contains(&value) {
            return Err(MesaError::BadRequest(format!(
                "rating must be within 0.0..=5.0, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Review document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ReviewDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Review identifier
    pub review_id: String,

    /// Reviewed canonical place
    pub place_id: String,

    /// Denormalized place name at submission time
    pub place_name: String,

    /// Author
    pub user_id: String,

    /// Denormalized author display fields
    pub user_first_name: String,
    pub user_last_name: String,
    pub profile_photo_url: String,

    pub food_rating: Rating,
    pub service_rating: Rating,
    pub ambience_rating: Rating,

    #[serde(default)]
    pub favorite_dishes: Vec<String>,

    pub review_text: String,

    /// Stored media URLs, ordered by submission index
    #[serde(default)]
    pub media_urls: Vec<String>,
}

impl IntoIndexes for ReviewDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "review_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("review_id_unique".to_string())
                        .build(),
                ),
            ),
            // Reviews are listed per place
            (
                doc! { "place_id": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("place_created_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ReviewDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0.0).is_ok());
        assert!(Rating::new(5.0).is_ok());
        assert!(Rating::new(3.7).is_ok());
        assert!(Rating::new(-0.1).is_err());
        assert!(Rating::new(5.1).is_err());
        assert!(Rating::new(f64::NAN).is_err());
    }

    #[test]
    fn test_rating_serializes_transparently() {
        let r = Rating::new(4.5).unwrap();
        assert_eq!(serde_json::to_string(&r).unwrap(), "4.5");
    }
}
