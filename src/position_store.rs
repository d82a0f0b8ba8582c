//! Aircraft position document store.
//!
//! Positions are persisted in an embedded [sled] database using two trees:
//!
//! * `positions` maps a big-endian document id to the JSON encoded [AircraftPosition]. Ids come
//!   from [sled::Db::generate_id], which is monotonic, so iterating this tree yields documents in
//!   insertion order. Listings are paginated in this order.
//! * `positions_by_icao` maps `<icao length><icao><document id>` to an empty value. The length
//!   prefix keeps one aircraft's keys from matching the prefix of another whose ICAO address
//!   starts with the same characters.
//!
//! Inserts and deletes update both trees in a single transaction.

use crate::error::AircraftApiError;
use crate::models::{AircraftPosition, ListParams, PositionSummary, TypeCount};

use std::path::Path;

use async_trait::async_trait;
use hashbrown::HashMap;
use sled::transaction::{TransactionError, Transactional};
use sled::Tree;

/// Position store trait.
///
/// Defines the queries supported over aircraft position documents.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Insert a new position document. Duplicates are permitted.
    async fn insert(&self, position: &AircraftPosition) -> Result<(), AircraftApiError>;

    /// List a page of position summaries in insertion order.
    async fn list(&self, params: &ListParams) -> Result<Vec<PositionSummary>, AircraftApiError>;

    /// Count documents by aircraft type, most common first.
    ///
    /// Documents without a type are counted in a `None` group. Types with equal counts are
    /// ordered by type, with `None` first.
    async fn type_counts(&self) -> Result<Vec<TypeCount>, AircraftApiError>;

    /// Return the position with the greatest timestamp for an aircraft.
    ///
    /// If several positions share the greatest timestamp the most recently inserted is returned.
    async fn latest(&self, icao: &str) -> Result<Option<AircraftPosition>, AircraftApiError>;

    /// Delete every position of an aircraft, returning the number deleted.
    async fn delete(&self, icao: &str) -> Result<u64, AircraftApiError>;
}

/// Position store backed by an embedded sled database.
#[derive(Clone, Debug)]
pub struct SledPositionStore {
    db: sled::Db,
    positions: Tree,
    by_icao: Tree,
}

impl SledPositionStore {
    /// Open or create a position store at a path.
    pub fn open(path: &Path) -> Result<Self, AircraftApiError> {
        tracing::info!("Opening position store at {}", path.display());
        Self::from_db(sled::open(path)?)
    }

    /// Create a position store in a temporary database that is removed when dropped.
    pub fn temporary() -> Result<Self, AircraftApiError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, AircraftApiError> {
        let positions = db.open_tree("positions")?;
        let by_icao = db.open_tree("positions_by_icao")?;
        Ok(SledPositionStore {
            db,
            positions,
            by_icao,
        })
    }

    /// Document ids of every position of an aircraft, in insertion order.
    fn ids_for(&self, icao: &str) -> Result<Vec<[u8; 8]>, AircraftApiError> {
        let prefix = icao_prefix(icao);
        let mut ids = Vec::new();
        for entry in self.by_icao.scan_prefix(&prefix) {
            let (key, _) = entry?;
            let mut id = [0u8; 8];
            id.copy_from_slice(&key[prefix.len()..]);
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Index key prefix of an aircraft.
fn icao_prefix(icao: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + icao.len());
    prefix.extend_from_slice(&(icao.len() as u32).to_be_bytes());
    prefix.extend_from_slice(icao.as_bytes());
    prefix
}

/// Index key of a position document.
fn icao_key(icao: &str, id: &[u8; 8]) -> Vec<u8> {
    let mut key = icao_prefix(icao);
    key.extend_from_slice(id);
    key
}

/// Unwrap a transaction error. Transactions here never abort explicitly.
fn storage_error(error: TransactionError<()>) -> AircraftApiError {
    match error {
        TransactionError::Storage(error) => AircraftApiError::PositionStore(error),
        TransactionError::Abort(()) => AircraftApiError::PositionStore(sled::Error::Unsupported(
            "position store transaction aborted".to_string(),
        )),
    }
}

/// Read a page of position summaries in document id order.
///
/// Scans the tree, so run it off the async executor.
fn list_page(
    positions: &Tree,
    offset: usize,
    limit: usize,
) -> Result<Vec<PositionSummary>, AircraftApiError> {
    positions
        .iter()
        .values()
        .skip(offset)
        .take(limit)
        .map(|document| -> Result<PositionSummary, AircraftApiError> {
            let position: AircraftPosition = serde_json::from_slice(&document?)?;
            Ok(position.into())
        })
        .collect()
}

/// Count documents by aircraft type, most common first.
///
/// Scans the tree, so run it off the async executor.
fn count_types(positions: &Tree) -> Result<Vec<TypeCount>, AircraftApiError> {
    let mut counts: HashMap<Option<String>, u64> = HashMap::new();
    for document in positions.iter().values() {
        let position: AircraftPosition = serde_json::from_slice(&document?)?;
        *counts.entry(position.aircraft_type).or_default() += 1;
    }
    let mut counts: Vec<TypeCount> = counts
        .into_iter()
        .map(|(aircraft_type, count)| TypeCount {
            aircraft_type,
            count,
        })
        .collect();
    counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.aircraft_type.cmp(&b.aircraft_type))
    });
    Ok(counts)
}

#[async_trait]
impl PositionStore for SledPositionStore {
    #[tracing::instrument(level = "DEBUG", skip(self, position), fields(icao = %position.icao))]
    async fn insert(&self, position: &AircraftPosition) -> Result<(), AircraftApiError> {
        let id = self.db.generate_id()?.to_be_bytes();
        let document = serde_json::to_vec(position)?;
        let index_key = icao_key(&position.icao, &id);
        (&self.positions, &self.by_icao)
            .transaction(|(positions, by_icao)| {
                positions.insert(&id[..], document.as_slice())?;
                by_icao.insert(index_key.as_slice(), Vec::new())?;
                Ok(())
            })
            .map_err(storage_error)?;
        Ok(())
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn list(&self, params: &ListParams) -> Result<Vec<PositionSummary>, AircraftApiError> {
        let positions = self.positions.clone();
        let (offset, limit) = (params.offset(), params.page_size);
        tokio::task::spawn_blocking(move || list_page(&positions, offset, limit)).await?
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn type_counts(&self) -> Result<Vec<TypeCount>, AircraftApiError> {
        let positions = self.positions.clone();
        tokio::task::spawn_blocking(move || count_types(&positions)).await?
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn latest(&self, icao: &str) -> Result<Option<AircraftPosition>, AircraftApiError> {
        let mut latest: Option<AircraftPosition> = None;
        // Ids are visited in insertion order, so on equal timestamps the later document wins.
        for id in self.ids_for(icao)? {
            let Some(document) = self.positions.get(id)? else {
                continue;
            };
            let position: AircraftPosition = serde_json::from_slice(&document)?;
            if latest
                .as_ref()
                .map_or(true, |current| position.timestamp >= current.timestamp)
            {
                latest = Some(position);
            }
        }
        Ok(latest)
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn delete(&self, icao: &str) -> Result<u64, AircraftApiError> {
        let ids = self.ids_for(icao)?;
        if ids.is_empty() {
            return Ok(0);
        }
        let deleted = (&self.positions, &self.by_icao)
            .transaction(|(positions, by_icao)| {
                let mut deleted: u64 = 0;
                for id in &ids {
                    if positions.remove(&id[..])?.is_some() {
                        deleted += 1;
                    }
                    by_icao.remove(icao_key(icao, id))?;
                }
                Ok(deleted)
            })
            .map_err(storage_error)?;
        tracing::debug!("Deleted {} positions of {}", deleted, icao);
        Ok(deleted)
    }
}
