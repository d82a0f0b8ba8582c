//! This crate provides the Aircraft API server. It ingests aircraft position snapshots published
//! by a remote ADS-B source and serves a small query API over stored aircraft positions.
//!
//! Ingestion runs in two stages, each triggered by an HTTP request:
//!
//! * download fetches the first snapshots of a day and stages them unmodified in an
//!   S3-compatible object store.
//! * prepare reads the staged snapshots back, decompresses them and writes the aircraft array of
//!   each to a local directory as plain JSON.
//!
//! Aircraft positions are stored as documents in an embedded database and can be created,
//! listed, counted by aircraft type, looked up and deleted by ICAO address.
//!
//! The Aircraft API is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team. Axum performs well in [various](https://github.com/programatik29/rust-web-benchmarks/blob/master/result/hello-world.md) [benchmarks](https://web-frameworks-benchmark.netlify.app/result?l=rust)
//!   and is built on top of various popular components, including the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response data.
//! * [AWS SDK for S3](aws-sdk-s3) is used to interact with S3-compatible object stores.
//! * [reqwest] fetches snapshots from the remote source.
//! * [sled] is the embedded database holding aircraft positions.

pub mod app;
pub mod app_state;
pub mod cli;
pub mod compression;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod object_store;
pub mod position_store;
pub mod s3_client;
pub mod server;
pub mod snapshot;
pub mod snapshot_source;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_json;
