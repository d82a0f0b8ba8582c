use crate::error::AircraftApiError;
use crate::ingest::IngestConfig;
use crate::models::*;
use crate::object_store::ObjectStore;
use crate::snapshot::SnapshotDay;
use crate::snapshot_source::SnapshotSource;

use std::collections::BTreeMap;
use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::Router;
use flate2::read::GzEncoder;
use flate2::Compression;
use url::Url;

/// Bucket used by test ingestion configurations.
pub(crate) const TEST_BUCKET: &str = "bdi-aircraft";

/// Create an AircraftPosition object with only required fields set.
pub(crate) fn get_test_position() -> AircraftPosition {
    AircraftPosition {
        icao: "abc123".to_string(),
        registration: None,
        aircraft_type: None,
        lat: 51.47,
        lon: -0.4543,
        alt_baro: None,
        ground_speed: None,
        timestamp: "2023-11-01T00:00:00Z".to_string(),
    }
}

/// Create an AircraftPosition object with all fields set.
pub(crate) fn get_test_position_optional() -> AircraftPosition {
    AircraftPosition {
        icao: "abc123".to_string(),
        registration: Some("G-EUPT".to_string()),
        aircraft_type: Some("A319".to_string()),
        lat: 51.47,
        lon: -0.4543,
        alt_baro: Some(3500.0),
        ground_speed: Some(180.5),
        timestamp: "2023-11-01T00:00:00Z".to_string(),
    }
}

/// Create an IngestConfig writing prepared files to a directory.
pub(crate) fn get_test_ingest_config(prepared_dir: &Path) -> IngestConfig {
    IngestConfig {
        source_url: Url::parse("http://source.example.com/readsb-hist").unwrap(),
        day: SnapshotDay::default(),
        bucket: TEST_BUCKET.to_string(),
        prepared_dir: prepared_dir.to_path_buf(),
    }
}

/// Gzip compress some data.
pub(crate) fn gzip(input: &[u8]) -> Bytes {
    let mut result = Vec::<u8>::new();
    let mut deflater = GzEncoder::new(input, Compression::fast());
    deflater.read_to_end(&mut result).unwrap();
    result.into()
}

/// A snapshot source that serves the same body for every URL and records requests.
pub(crate) struct FakeSnapshotSource {
    body: Bytes,
    fail_after: Option<usize>,
    requests: Mutex<Vec<String>>,
}

impl FakeSnapshotSource {
    pub(crate) fn new(body: &'static [u8]) -> Self {
        FakeSnapshotSource {
            body: Bytes::from_static(body),
            fail_after: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every request after the first `count`.
    pub(crate) fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// URLs requested so far, in order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotSource for FakeSnapshotSource {
    async fn fetch(&self, url: &Url) -> Result<Bytes, AircraftApiError> {
        let failed = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(url.to_string());
            matches!(self.fail_after, Some(count) if requests.len() > count)
        };
        if failed {
            Err(connection_refused().await.into())
        } else {
            Ok(self.body.clone())
        }
    }
}

/// Return the error from a request to a local port with no listener.
pub(crate) async fn connection_refused() -> reqwest::Error {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    reqwest::get(format!("http://{addr}/")).await.unwrap_err()
}

/// Serve a router on an ephemeral local port, returning the bound address.
///
/// The server runs until the test runtime shuts down.
pub(crate) fn serve(router: Router) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(router.into_make_service());
    tokio::spawn(server);
    addr
}

/// An in-memory object store.
pub(crate) struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), Bytes>>,
}

impl MemoryObjectStore {
    pub(crate) fn new() -> Self {
        MemoryObjectStore {
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) fn insert(&self, bucket: &str, key: &str, body: Bytes) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body);
    }

    pub(crate) fn get(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys of all objects in a bucket, in ascending order.
    pub(crate) fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> Result<(), AircraftApiError> {
        self.insert(bucket, key, body);
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, AircraftApiError> {
        Ok(self
            .keys(bucket)
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, AircraftApiError> {
        // Missing objects are not expected in tests.
        Ok(self.get(bucket, key).unwrap_or_default())
    }
}
