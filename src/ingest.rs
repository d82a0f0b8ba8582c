//! Snapshot ingestion pipeline.
//!
//! Ingestion has two stages, each run on request:
//!
//! * [Ingestion::download] fetches the first snapshots of the configured day from the remote
//!   source and stages the raw bytes in object storage under `raw/day=<YYYYMMDD>/`.
//! * [Ingestion::prepare] reads every staged snapshot back, decompresses it and writes its
//!   `aircraft` array to the prepared directory, one file per snapshot.
//!
//! Both stages are sequential and fail fast. Objects and files written before a failure are
//! left in place.

use crate::cli::CommandLineArgs;
use crate::compression;
use crate::error::AircraftApiError;
use crate::metrics::{SNAPSHOTS_DOWNLOADED, SNAPSHOTS_PREPARED};
use crate::object_store::ObjectStore;
use crate::snapshot::{self, SnapshotDay};
use crate::snapshot_source::SnapshotSource;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use serde_json::Value;
use url::Url;

/// Ingestion configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestConfig {
    /// Base URL of the remote snapshot source
    pub source_url: Url,
    /// Day whose snapshots are ingested
    pub day: SnapshotDay,
    /// Bucket in which raw snapshots are staged
    pub bucket: String,
    /// Directory in which prepared snapshots are written
    pub prepared_dir: PathBuf,
}

impl IngestConfig {
    /// Create an ingestion configuration from command line arguments.
    pub fn from_args(args: &CommandLineArgs) -> Self {
        IngestConfig {
            source_url: args.source_url.clone(),
            day: args.snapshot_day,
            bucket: args.s3_bucket.clone(),
            prepared_dir: args.prepared_dir.clone(),
        }
    }

    /// URL of a snapshot file at the source.
    fn snapshot_url(&self, filename: &str) -> Result<Url, AircraftApiError> {
        let base = self.source_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{base}/{}/{filename}",
            self.day.url_path()
        ))?)
    }
}

/// Snapshot ingestion pipeline.
pub struct Ingestion {
    config: IngestConfig,
    source: Arc<dyn SnapshotSource>,
    object_store: Arc<dyn ObjectStore>,
}

impl Ingestion {
    /// Create an ingestion pipeline.
    ///
    /// # Arguments
    ///
    /// * `config`: Ingestion configuration
    /// * `source`: Remote snapshot source
    /// * `object_store`: Object store in which raw snapshots are staged
    pub fn new(
        config: IngestConfig,
        source: Arc<dyn SnapshotSource>,
        object_store: Arc<dyn ObjectStore>,
    ) -> Self {
        Ingestion {
            config,
            source,
            object_store,
        }
    }

    /// The ingestion configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Download the first `file_limit` snapshots of the day to object storage.
    ///
    /// Snapshots are fetched in ascending time order. The response body is stored whatever the
    /// response status. The first fetch or store failure aborts the download.
    ///
    /// Returns the number of snapshots stored.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn download(&self, file_limit: usize) -> Result<usize, AircraftApiError> {
        let filenames = snapshot::first_snapshot_filenames(file_limit);
        tracing::info!(
            "Downloading {} snapshots for day {}",
            filenames.len(),
            self.config.day
        );
        for filename in &filenames {
            let url = self.config.snapshot_url(filename)?;
            let body = self.source.fetch(&url).await?;
            let key = self.config.day.raw_key(filename);
            tracing::debug!("Storing {} bytes at {}", body.len(), key);
            self.object_store
                .put_object(&self.config.bucket, &key, body)
                .await?;
            SNAPSHOTS_DOWNLOADED.inc();
        }
        Ok(filenames.len())
    }

    /// Prepare every staged snapshot of the day.
    ///
    /// A snapshot that is not valid JSON aborts preparation, reporting the object key.
    ///
    /// Returns the number of prepared files written.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn prepare(&self) -> Result<usize, AircraftApiError> {
        let prepared_dir = &self.config.prepared_dir;
        tokio::fs::create_dir_all(prepared_dir)
            .await
            .map_err(|source| AircraftApiError::PreparedDirectory {
                path: prepared_dir.clone(),
                source,
            })?;

        let prefix = self.config.day.raw_prefix();
        let keys = self
            .object_store
            .list_objects(&self.config.bucket, &prefix)
            .await?;
        if keys.is_empty() {
            tracing::info!("No snapshots under {} to prepare", prefix);
            return Ok(0);
        }

        let mut prepared = 0;
        for key in &keys {
            let Some(filename) = snapshot::prepared_filename(key) else {
                tracing::debug!("Skipping object {} with no file name", key);
                continue;
            };
            let data = self.object_store.get_object(&self.config.bucket, key).await?;
            let aircraft = extract_aircraft(key, &data)?;
            let path = prepared_dir.join(filename);
            write_prepared(&path, &aircraft).await?;
            SNAPSHOTS_PREPARED.inc();
            prepared += 1;
        }
        tracing::info!("Prepared {} snapshots in {}", prepared, prepared_dir.display());
        Ok(prepared)
    }
}

/// Extract the `aircraft` value from raw snapshot data.
///
/// The data may or may not be gzip compressed. A document without an `aircraft` field yields an
/// empty array.
///
/// # Arguments
///
/// * `key`: Object key of the snapshot, used in error reports
/// * `data`: Raw snapshot data
pub fn extract_aircraft(key: &str, data: &Bytes) -> Result<Value, AircraftApiError> {
    let json = compression::decompress_gzip_lenient(data).map_err(|source| {
        AircraftApiError::Decompression {
            key: key.to_string(),
            source,
        }
    })?;
    let document: Value =
        serde_json::from_slice(&json).map_err(|source| AircraftApiError::SnapshotJson {
            key: key.to_string(),
            source,
        })?;
    match document {
        Value::Object(mut fields) => Ok(fields
            .remove("aircraft")
            .unwrap_or_else(|| Value::Array(Vec::new()))),
        _ => Err(AircraftApiError::SnapshotNotObject {
            key: key.to_string(),
        }),
    }
}

/// Write a prepared snapshot, replacing any existing file.
async fn write_prepared(path: &Path, aircraft: &Value) -> Result<(), AircraftApiError> {
    let result = match serde_json::to_vec(aircraft) {
        Ok(contents) => tokio::fs::write(path, contents).await,
        Err(err) => Err(err.into()),
    };
    result.map_err(|source| AircraftApiError::PreparedWrite {
        path: path.to_path_buf(),
        source,
    })
}
