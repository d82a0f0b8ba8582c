use crate::cli::CommandLineArgs;
use crate::error::AircraftApiError;
use crate::ingest::{IngestConfig, Ingestion};
use crate::position_store::{PositionStore, SledPositionStore};
use crate::s3_client::S3Client;
use crate::snapshot_source::HttpSnapshotSource;

use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Snapshot ingestion pipeline.
    pub ingestion: Ingestion,

    /// Aircraft position store.
    pub positions: Arc<dyn PositionStore>,
}

impl AppState {
    /// Create an [AppState] from its components.
    pub fn new(ingestion: Ingestion, positions: Arc<dyn PositionStore>) -> Self {
        Self {
            ingestion,
            positions,
        }
    }

    /// Create and return an [AppState] backed by the components named in the command line
    /// arguments.
    pub async fn from_args(args: &CommandLineArgs) -> Result<Self, AircraftApiError> {
        let object_store = Arc::new(S3Client::from_args(args).await);
        let source = Arc::new(HttpSnapshotSource::new());
        let ingestion = Ingestion::new(IngestConfig::from_args(args), source, object_store);
        let positions = Arc::new(SledPositionStore::open(&args.position_store_path)?);
        Ok(Self::new(ingestion, positions))
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
