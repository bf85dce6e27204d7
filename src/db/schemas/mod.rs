//! Database schemas for Mesa
//!
//! Defines MongoDB document structures for canonical places, place lists,
//! reviews, profiles, and follow relationships.

mod favorite;
mod follow;
mod metadata;
mod place;
mod place_list;
mod profile;
mod review;

pub use favorite::{FavoriteDoc, FAVORITE_COLLECTION};
pub use follow::{FollowDoc, FOLLOWERS_COLLECTION, FOLLOWING_COLLECTION};
pub use metadata::Metadata;
pub use place::{
    dedup_key, ContributionType, ContributorRecord, Coordinate, PlaceDoc, PLACE_COLLECTION,
};
pub use place_list::{ListEntry, PlaceListDoc, PLACE_LIST_COLLECTION};
pub use profile::{ProfileDoc, PROFILE_COLLECTION};
pub use review::{Rating, ReviewDoc, REVIEW_COLLECTION};
