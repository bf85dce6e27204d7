//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::MesaError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    ///
    /// `timeout_ms` caps both server selection and the initial connect, so an
    /// unreachable MongoDB fails fast instead of hanging.
    pub async fn new(uri: &str, db_name: &str, timeout_ms: u64) -> Result<Self, MesaError> {
        info!("Connecting to MongoDB at {}", uri);

        let timeout_uri = if uri.contains('?') {
            format!(
                "{}&serverSelectionTimeoutMS={}&connectTimeoutMS={}",
                uri, timeout_ms, timeout_ms
            )
        } else {
            format!(
                "{}?serverSelectionTimeoutMS={}&connectTimeoutMS={}",
                uri, timeout_ms, timeout_ms
            )
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| MesaError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MesaError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, MesaError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, MesaError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), MesaError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| MesaError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, MesaError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| MesaError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| MesaError::Database("Failed to get inserted ID".into()))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, MesaError> {
        // Add is_deleted check
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| MesaError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, MesaError> {
        use futures_util::StreamExt;

        // Add is_deleted check
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let cursor = self
            .inner
            .find(full_filter)
            .await
            .map_err(|e| MesaError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Count documents matching a filter
    pub async fn count(&self, filter: Document) -> Result<u64, MesaError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .count_documents(full_filter)
            .await
            .map_err(|e| MesaError::Database(format!("Count failed: {}", e)))
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, MesaError> {
        let modifications = update.into();

        self.inner
            .update_one(filter, modifications)
            .await
            .map_err(|e| MesaError::Database(format!("Update failed: {}", e)))
    }

    /// Replace a document only if its stored version still matches
    /// `expected_version`.
    ///
    /// This is the lost-update guard for read-modify-write flows: the caller
    /// reads a document, mutates it in memory, bumps its version field, and
    /// writes back conditioned on the version it read. A `StaleWrite` means
    /// another writer got in between; the caller retries from a fresh read.
    pub async fn replace_one_versioned(
        &self,
        mut filter: Document,
        expected_version: i64,
        mut item: T,
    ) -> Result<(), MesaError> {
        filter.insert("version", expected_version);

        item.mut_metadata().updated_at = Some(DateTime::now());

        let result = self
            .inner
            .replace_one(filter.clone(), item)
            .await
            .map_err(|e| MesaError::Database(format!("Replace failed: {}", e)))?;

        if result.matched_count == 0 {
            return Err(MesaError::StaleWrite(format!(
                "document matching {:?} changed since version {}",
                filter, expected_version
            )));
        }

        Ok(())
    }

    /// Upsert a whole document by filter (last write wins)
    pub async fn replace_upsert(&self, filter: Document, mut item: T) -> Result<(), MesaError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        if metadata.created_at.is_none() {
            metadata.created_at = Some(DateTime::now());
        }
        metadata.updated_at = Some(DateTime::now());

        self.inner
            .replace_one(filter, item)
            .upsert(true)
            .await
            .map_err(|e| MesaError::Database(format!("Upsert failed: {}", e)))?;

        Ok(())
    }

    /// Hard delete a document
    pub async fn delete_one(&self, filter: Document) -> Result<u64, MesaError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| MesaError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count)
    }

    /// Soft delete a document
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult, MesaError> {
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": DateTime::now(),
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.update_one(filter, update).await
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    // Integration tests require a running MongoDB instance; the store traits
    // in `services` are covered against in-memory implementations instead.
}
