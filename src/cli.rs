//! Command Line Interface (CLI) arguments.

use crate::snapshot::SnapshotDay;

use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// Aircraft API command line interface
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "AIRCRAFT_API_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "AIRCRAFT_API_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "AIRCRAFT_API_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/aircraft-api/certs/cert.pem",
        env = "AIRCRAFT_API_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/aircraft-api/certs/key.pem",
        env = "AIRCRAFT_API_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "AIRCRAFT_API_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "AIRCRAFT_API_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Base URL of the remote snapshot source
    #[arg(
        long,
        default_value = "https://samples.adsbexchange.com/readsb-hist",
        env = "AIRCRAFT_API_SOURCE_URL"
    )]
    pub source_url: Url,
    /// Day whose snapshots are downloaded and prepared (YYYYMMDD)
    #[arg(long, default_value = "20231101", env = "AIRCRAFT_API_SNAPSHOT_DAY")]
    pub snapshot_day: SnapshotDay,
    /// Bucket in which raw snapshots are staged
    #[arg(long, default_value = "bdi-aircraft", env = "AIRCRAFT_API_S3_BUCKET")]
    pub s3_bucket: String,
    /// URL of an S3-compatible object store. AWS S3 is used if not set.
    #[arg(long, env = "AIRCRAFT_API_S3_ENDPOINT")]
    pub s3_endpoint: Option<Url>,
    /// Object store region
    #[arg(long, default_value = "us-east-1", env = "AIRCRAFT_API_S3_REGION")]
    pub s3_region: String,
    /// Object store access key
    #[arg(long, env = "AIRCRAFT_API_S3_ACCESS_KEY")]
    pub s3_access_key: Option<String>,
    /// Object store secret key
    #[arg(long, env = "AIRCRAFT_API_S3_SECRET_KEY", hide_env_values = true)]
    pub s3_secret_key: Option<String>,
    /// Object store session token for temporary credentials
    #[arg(long, env = "AIRCRAFT_API_S3_SESSION_TOKEN", hide_env_values = true)]
    pub s3_session_token: Option<String>,
    /// Directory in which prepared snapshots are written
    #[arg(long, default_value = "data/prepared", env = "AIRCRAFT_API_PREPARED_DIR")]
    pub prepared_dir: PathBuf,
    /// Directory of the embedded position store database
    #[arg(
        long,
        default_value = "data/positions",
        env = "AIRCRAFT_API_POSITION_STORE_PATH"
    )]
    pub position_store_path: PathBuf,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
