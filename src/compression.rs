//! (De)compression support.

use axum::body::Bytes;
use flate2::read::MultiGzDecoder;
use std::io::Read;

/// Magic number at the start of every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Returns true if the data starts with the gzip magic number.
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Decompresses gzip data, passing through data that is not gzip compressed.
///
/// Snapshots are normally gzip compressed, but some sources serve them with a
/// `Content-Encoding` that has already been decoded. Data without the gzip magic number is
/// returned unchanged. Data with the magic number that fails to decompress is an error.
///
/// # Arguments
///
/// * `data`: Possibly compressed data [Bytes](axum::body::Bytes)
pub fn decompress_gzip_lenient(data: &Bytes) -> Result<Bytes, std::io::Error> {
    if !is_gzip(data) {
        return Ok(data.clone());
    }
    let mut decoder = MultiGzDecoder::<&[u8]>::new(data);
    let mut buf = Vec::with_capacity(data.len() * 4);
    decoder.read_to_end(&mut buf)?;
    Ok(buf.into())
}
