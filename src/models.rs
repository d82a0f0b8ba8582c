//! Data types and associated functions and methods

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Default number of snapshot files fetched by a download request.
pub const DEFAULT_FILE_LIMIT: usize = 100;

/// Default number of position documents per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Maximum number of position documents per page.
pub const MAX_PAGE_SIZE: usize = 100;

/// Query parameters for snapshot downloads
#[derive(Debug, Deserialize, PartialEq, Validate)]
pub struct DownloadParams {
    /// Number of snapshot files to download, starting from the first of the day
    #[serde(default = "default_file_limit")]
    pub file_limit: usize,
}

fn default_file_limit() -> usize {
    DEFAULT_FILE_LIMIT
}

impl Default for DownloadParams {
    fn default() -> Self {
        DownloadParams {
            file_limit: DEFAULT_FILE_LIMIT,
        }
    }
}

/// Query parameters for paginated listing of positions
#[derive(Debug, Deserialize, PartialEq, Validate)]
pub struct ListParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be greater than 0"))]
    pub page: usize,
    /// Number of results per page
    #[serde(default = "default_page_size")]
    #[validate(range(
        min = 1,
        max = 100,
        message = "page_size must be between 1 and 100"
    ))]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl ListParams {
    /// Return a new ListParams object.
    pub fn new(page: usize, page_size: usize) -> Self {
        ListParams { page, page_size }
    }

    /// Number of documents to skip before the first document of the page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

impl Default for ListParams {
    fn default() -> Self {
        ListParams::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// A single observed aircraft position
///
/// Documents are never updated. Several documents may share an `icao`, one per observed
/// timestamp. Numeric fields also accept numeric strings, e.g. `"51.47"`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
pub struct AircraftPosition {
    /// ICAO 24-bit address of the aircraft
    pub icao: String,
    /// Aircraft registration, e.g. N12345
    pub registration: Option<String>,
    /// ICAO aircraft type designator, e.g. A319
    #[serde(rename = "type")]
    pub aircraft_type: Option<String>,
    /// Latitude in degrees
    #[serde(deserialize_with = "f64_from_number_or_str")]
    pub lat: f64,
    /// Longitude in degrees
    #[serde(deserialize_with = "f64_from_number_or_str")]
    pub lon: f64,
    /// Barometric altitude in feet
    #[serde(default, deserialize_with = "optional_f64_from_number_or_str")]
    pub alt_baro: Option<f64>,
    /// Ground speed in knots
    #[serde(default, deserialize_with = "optional_f64_from_number_or_str")]
    pub ground_speed: Option<f64>,
    /// Observation time. Compared as a string, so must be in a sortable format such as RFC 3339.
    pub timestamp: String,
}

/// A JSON number, or a string holding one
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrStr {
    Number(f64),
    Str(String),
}

impl NumberOrStr {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        let value = match self {
            NumberOrStr::Number(value) => value,
            NumberOrStr::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid number {:?}", s)))?,
        };
        // Non-finite values cannot be stored as JSON numbers.
        if value.is_finite() {
            Ok(value)
        } else {
            Err(E::custom(format!("invalid number {}", value)))
        }
    }
}

// Custom deserializer accepting a number or a numeric string
fn f64_from_number_or_str<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrStr::deserialize(deserializer)?.into_f64()
}

// Custom deserializer accepting null, a number or a numeric string
fn optional_f64_from_number_or_str<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberOrStr>::deserialize(deserializer)?
        .map(NumberOrStr::into_f64)
        .transpose()
}

/// Projection of a position document returned by listings
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PositionSummary {
    pub icao: String,
    pub registration: Option<String>,
    #[serde(rename = "type")]
    pub aircraft_type: Option<String>,
}

impl From<AircraftPosition> for PositionSummary {
    fn from(position: AircraftPosition) -> Self {
        PositionSummary {
            icao: position.icao,
            registration: position.registration,
            aircraft_type: position.aircraft_type,
        }
    }
}

/// Number of position documents with a given aircraft type
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub aircraft_type: Option<String>,
    pub count: u64,
}

impl TypeCount {
    /// Return a new TypeCount object.
    pub fn new(aircraft_type: Option<&str>, count: u64) -> Self {
        TypeCount {
            aircraft_type: aircraft_type.map(str::to_string),
            count,
        }
    }
}

/// Acknowledgement of a stored document
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        StatusResponse {
            status: "ok".to_string(),
        }
    }
}

/// Number of documents removed by a delete
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

/// Version of the running server
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct VersionResponse {
    pub version: String,
}
