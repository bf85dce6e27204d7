//! Canonical place document schema
//!
//! One document per real-world place, shared by every contributing user.
//! Contributors are tracked in the embedded `added_by` map; the `version`
//! field guards read-modify-write updates to that map.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for canonical places
pub const PLACE_COLLECTION: &str = "places";

/// Geographic coordinate
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// How a user referenced a place
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContributionType {
    /// Saved to the user's profile favorites
    Favorite,
    /// Member of one of the user's named lists
    List,
}

/// Per-user annotation recording why a user referenced this place.
///
/// At most one per (user, place); a later contribution from the same user
/// replaces the earlier one.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ContributorRecord {
    pub contribution: ContributionType,

    /// Name of the owning list, when the contribution is a list membership
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_name: Option<String>,

    pub added_at: DateTime,
}

impl ContributorRecord {
    pub fn favorite() -> Self {
        Self {
            contribution: ContributionType::Favorite,
            list_name: None,
            added_at: DateTime::now(),
        }
    }

    pub fn list_member(list_name: &str) -> Self {
        Self {
            contribution: ContributionType::List,
            list_name: Some(list_name.to_string()),
            added_at: DateTime::now(),
        }
    }
}

/// Canonical place document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PlaceDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable provider-independent identifier
    pub place_id: String,

    /// External identifiers this place is known by, one per search provider
    #[serde(default)]
    pub provider_ids: Vec<String>,

    /// Secondary dedup key (normalized name + rounded coordinate), used to
    /// collapse records from different providers describing the same place
    pub dedup_key: String,

    pub name: String,
    pub address: String,
    pub coordinate: Coordinate,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Opening hours, one line per day, provider-formatted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_hours: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,

    /// user_id -> contributor record
    #[serde(default)]
    pub added_by: HashMap<String, ContributorRecord>,

    /// Monotonically increasing version for optimistic concurrency on
    /// `added_by`
    #[serde(default)]
    pub version: i64,
}

/// Normalized secondary lookup key for a place.
///
/// Coordinates are rounded to 4 decimal places (roughly 11 m), which is
/// tight enough to keep neighboring storefronts apart while absorbing
/// provider jitter for the same building.
pub fn dedup_key(name: &str, coordinate: &Coordinate) -> String {
    let normalized: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");

    format!(
        "{}|{:.4}|{:.4}",
        normalized, coordinate.latitude, coordinate.longitude
    )
}

impl IntoIndexes for PlaceDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "place_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("place_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "provider_ids": 1 },
                Some(
                    IndexOptions::builder()
                        .name("provider_ids_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "dedup_key": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("dedup_key_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PlaceDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_normalizes_name() {
        let coord = Coordinate {
            latitude: 33.748995,
            longitude: -84.387982,
        };
        let a = dedup_key("Mary Mac's Tea Room", &coord);
        let b = dedup_key("  Mary Mac's   TEA-ROOM ", &coord);
        assert_eq!(a, b);
        assert_eq!(a, "mary-mac-s-tea-room|33.7490|-84.3880");
    }

    #[test]
    fn test_dedup_key_separates_nearby_places() {
        let a = dedup_key(
            "Taqueria",
            &Coordinate {
                latitude: 33.7489,
                longitude: -84.3879,
            },
        );
        let b = dedup_key(
            "Taqueria",
            &Coordinate {
                latitude: 33.7502,
                longitude: -84.3879,
            },
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_contributor_record_shapes() {
        let fav = ContributorRecord::favorite();
        assert_eq!(fav.contribution, ContributionType::Favorite);
        assert!(fav.list_name.is_none());

        let member = ContributorRecord::list_member("date nights");
        assert_eq!(member.contribution, ContributionType::List);
        assert_eq!(member.list_name.as_deref(), Some("date nights"));
    }
}
