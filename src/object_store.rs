//! Object store interface used to stage raw snapshots.

use crate::error::AircraftApiError;

use async_trait::async_trait;
use axum::body::Bytes;

/// Object store trait.
///
/// Defines the interface for bucket-and-key blob stores. The production implementation is
/// [crate::s3_client::S3Client].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object, replacing any existing object with the same key.
    ///
    /// # Arguments
    ///
    /// * `bucket`: Name of the bucket
    /// * `key`: Name of the object in the bucket
    /// * `body`: Object data
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes)
        -> Result<(), AircraftApiError>;

    /// List the keys of all objects in a bucket that start with a prefix.
    ///
    /// Keys are returned in ascending lexicographic order.
    ///
    /// # Arguments
    ///
    /// * `bucket`: Name of the bucket
    /// * `prefix`: Key prefix
    async fn list_objects(&self, bucket: &str, prefix: &str)
        -> Result<Vec<String>, AircraftApiError>;

    /// Retrieve an object's data.
    ///
    /// # Arguments
    ///
    /// * `bucket`: Name of the bucket
    /// * `key`: Name of the object in the bucket
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, AircraftApiError>;
}
