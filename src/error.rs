//! Error handling.

use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_smithy_types::byte_stream::error::Error as ByteStreamError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{event, Level};

/// Aircraft API error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum AircraftApiError {
    /// No position documents exist for the requested aircraft
    #[error("aircraft {icao} not found")]
    AircraftNotFound { icao: String },

    /// Error decompressing snapshot data
    #[error("failed to decompress snapshot {key}")]
    Decompression {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Error serialising or deserialising a position document
    #[error("failed to encode position document")]
    PositionEncoding(#[from] serde_json::Error),

    /// Error from the embedded position store
    #[error("position store error")]
    PositionStore(#[from] sled::Error),

    /// A blocking position store scan panicked or was cancelled
    #[error("position store task failed")]
    PositionStoreTask(#[from] tokio::task::JoinError),

    /// Error creating the prepared data directory
    #[error("failed to create prepared directory {}", path.display())]
    PreparedDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing a prepared file
    #[error("failed to write prepared file {}", path.display())]
    PreparedWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error deserialising request data into a model
    #[error("request data is not valid")]
    RequestDataJsonRejection(#[from] JsonRejection),

    /// Error deserialising query string parameters
    #[error("request query is not valid")]
    RequestQueryRejection(#[from] QueryRejection),

    /// Error validating request data (multiple errors)
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error reading object data from S3
    #[error("error receiving object from S3 storage")]
    S3ByteStream(#[from] ByteStreamError),

    /// Error while retrieving an object from S3
    #[error("error retrieving object from S3 storage")]
    S3GetObject(#[from] SdkError<GetObjectError>),

    /// Error while listing objects in S3
    #[error("error listing objects in S3 storage")]
    S3ListObjects(#[from] SdkError<ListObjectsV2Error>),

    /// Error while storing an object in S3
    #[error("error storing object in S3 storage")]
    S3PutObject(#[from] SdkError<PutObjectError>),

    /// Snapshot document could not be parsed as JSON
    #[error("snapshot {key} is not valid JSON")]
    SnapshotJson {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot document is valid JSON but not an object
    #[error("snapshot {key} is not a JSON object")]
    SnapshotNotObject { key: String },

    /// Error fetching a snapshot from the remote source
    #[error("error fetching snapshot from source")]
    SourceRequest(#[from] reqwest::Error),

    /// Snapshot URL could not be built from the configured source URL
    #[error("invalid snapshot source URL")]
    SourceUrl(#[from] url::ParseError),
}

impl IntoResponse for AircraftApiError {
    /// Convert from an `AircraftApiError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        // Remove duplicate entries.
        causes.dedup();
        let caused_by = if causes.is_empty() {
            None
        } else {
            Some(causes)
        };
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 401 unauthorised ErrorResponse
    fn unauthorised<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::UNAUTHORIZED, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    /// Tailor the response to an S3 SDK error.
    ///
    /// Generic SdkError variants (construction, dispatch, timeout, response) are server errors.
    /// Service errors are classified by their S3 error code.
    fn s3<E, R>(sdk_error: &SdkError<E, R>, error: &AircraftApiError) -> Self
    where
        E: ProvideErrorMetadata,
    {
        match sdk_error.as_service_error().and_then(|err| err.code()) {
            // Bad request
            Some("NoSuchBucket") | Some("NoSuchKey") => Self::bad_request(error),

            // Unauthorised
            Some("InvalidAccessKeyId") | Some("SignatureDoesNotMatch") | Some("AccessDenied") => {
                Self::unauthorised(error)
            }

            // Internal server error
            _ => Self::internal_server_error(error),
        }
    }
}

impl From<AircraftApiError> for ErrorResponse {
    /// Convert from an `AircraftApiError` into an `ErrorResponse`.
    fn from(error: AircraftApiError) -> Self {
        let response = match &error {
            // Bad request
            AircraftApiError::RequestDataJsonRejection(_)
            | AircraftApiError::RequestQueryRejection(_)
            | AircraftApiError::RequestDataValidation(_) => Self::bad_request(&error),

            // Not found
            AircraftApiError::AircraftNotFound { icao: _ } => Self::not_found(&error),

            // Internal server error
            AircraftApiError::Decompression { .. }
            | AircraftApiError::PositionEncoding(_)
            | AircraftApiError::PositionStore(_)
            | AircraftApiError::PositionStoreTask(_)
            | AircraftApiError::PreparedDirectory { .. }
            | AircraftApiError::PreparedWrite { .. }
            | AircraftApiError::S3ByteStream(_)
            | AircraftApiError::SnapshotJson { .. }
            | AircraftApiError::SnapshotNotObject { key: _ }
            | AircraftApiError::SourceRequest(_)
            | AircraftApiError::SourceUrl(_) => Self::internal_server_error(&error),

            AircraftApiError::S3GetObject(sdk_error) => Self::s3(sdk_error, &error),
            AircraftApiError::S3ListObjects(sdk_error) => Self::s3(sdk_error, &error),
            AircraftApiError::S3PutObject(sdk_error) => Self::s3(sdk_error, &error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aws_smithy_runtime_api::http::Response as SmithyResponse;
    use aws_smithy_runtime_api::http::StatusCode as SmithyStatusCode;
    use aws_smithy_types::error::ErrorMetadata as SmithyError;
    use hyper::HeaderMap;

    // Jump through the hoops to get the body as a string.
    async fn body_string(response: Response) -> String {
        String::from_utf8(
            hyper::body::to_bytes(response.into_body())
                .await
                .unwrap()
                .to_vec(),
        )
        .unwrap()
    }

    async fn error_response(error: AircraftApiError, status: StatusCode) -> ErrorResponse {
        let response = error.into_response();
        assert_eq!(status, response.status());
        let mut headers = HeaderMap::new();
        headers.insert(&header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert_eq!(headers, *response.headers());
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    async fn test_aircraft_api_error(
        error: AircraftApiError,
        status: StatusCode,
        message: &str,
        caused_by: Option<Vec<&'static str>>,
    ) {
        let error_response = error_response(error, status).await;
        assert_eq!(message.to_string(), error_response.error.message);
        // Map Vec items from str to String
        let caused_by = caused_by.map(|cb| cb.iter().map(|s| s.to_string()).collect());
        assert_eq!(caused_by, error_response.error.caused_by);
    }

    #[tokio::test]
    async fn aircraft_not_found() {
        let error = AircraftApiError::AircraftNotFound {
            icao: "abc123".to_string(),
        };
        let message = "aircraft abc123 not found";
        test_aircraft_api_error(error, StatusCode::NOT_FOUND, message, None).await;
    }

    #[tokio::test]
    async fn decompression_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::InvalidInput, "corrupt deflate stream");
        let error = AircraftApiError::Decompression {
            key: "raw/day=20231101/000000Z.json.gz".to_string(),
            source: io_error,
        };
        let message = "failed to decompress snapshot raw/day=20231101/000000Z.json.gz";
        let caused_by = Some(vec!["corrupt deflate stream"]);
        test_aircraft_api_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by)
            .await;
    }

    #[tokio::test]
    async fn snapshot_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{\"").unwrap_err();
        let cause = json_error.to_string();
        let error = AircraftApiError::SnapshotJson {
            key: "raw/day=20231101/000005Z.json.gz".to_string(),
            source: json_error,
        };
        let error_response = error_response(error, StatusCode::INTERNAL_SERVER_ERROR).await;
        assert_eq!(
            "snapshot raw/day=20231101/000005Z.json.gz is not valid JSON",
            error_response.error.message
        );
        assert_eq!(Some(vec![cause]), error_response.error.caused_by);
    }

    #[tokio::test]
    async fn snapshot_not_object() {
        let error = AircraftApiError::SnapshotNotObject {
            key: "raw/day=20231101/000010Z.json.gz".to_string(),
        };
        let message = "snapshot raw/day=20231101/000010Z.json.gz is not a JSON object";
        test_aircraft_api_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, None).await;
    }

    #[tokio::test]
    async fn prepared_write_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let error = AircraftApiError::PreparedWrite {
            path: PathBuf::from("/prepared/000000Z.json"),
            source: io_error,
        };
        let message = "failed to write prepared file /prepared/000000Z.json";
        let caused_by = Some(vec!["read-only"]);
        test_aircraft_api_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by)
            .await;
    }

    #[tokio::test]
    async fn prepared_directory_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let error = AircraftApiError::PreparedDirectory {
            path: PathBuf::from("/prepared"),
            source: io_error,
        };
        let message = "failed to create prepared directory /prepared";
        let caused_by = Some(vec!["read-only"]);
        test_aircraft_api_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by)
            .await;
    }

    #[tokio::test]
    async fn request_data_validation() {
        let mut validation_errors = validator::ValidationErrors::new();
        let validation_error = validator::ValidationError::new("foo");
        validation_errors.add("bar", validation_error);
        let error = AircraftApiError::RequestDataValidation(validation_errors);
        let message = "request data is not valid";
        let caused_by = Some(vec!["bar: Validation error: foo [{}]"]);
        test_aircraft_api_error(error, StatusCode::BAD_REQUEST, message, caused_by).await;
    }

    #[tokio::test]
    async fn position_store_error() {
        let error = AircraftApiError::PositionStore(sled::Error::Unsupported(
            "foo".to_string(),
        ));
        let error_response = error_response(error, StatusCode::INTERNAL_SERVER_ERROR).await;
        assert_eq!("position store error", error_response.error.message);
    }

    #[tokio::test]
    async fn position_store_task_error() {
        let join_error = tokio::spawn(async { panic!("scan failed") })
            .await
            .unwrap_err();
        let error = AircraftApiError::PositionStoreTask(join_error);
        let error_response = error_response(error, StatusCode::INTERNAL_SERVER_ERROR).await;
        assert_eq!("position store task failed", error_response.error.message);
    }

    #[tokio::test]
    async fn source_url_error() {
        let error = AircraftApiError::SourceUrl(url::ParseError::RelativeUrlWithoutBase);
        let message = "invalid snapshot source URL";
        let caused_by = Some(vec!["relative URL without a base"]);
        test_aircraft_api_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by)
            .await;
    }

    #[tokio::test]
    async fn source_request_error() {
        let error = AircraftApiError::SourceRequest(crate::test_utils::connection_refused().await);
        let error_response = error_response(error, StatusCode::INTERNAL_SERVER_ERROR).await;
        assert_eq!(
            "error fetching snapshot from source",
            error_response.error.message
        );
        assert!(error_response.error.caused_by.is_some());
    }

    #[tokio::test]
    async fn s3_byte_stream_error() {
        // ByteStreamError provides a From impl for std::io:Error.
        let error = AircraftApiError::S3ByteStream(
            std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into(),
        );
        let error_response = error_response(error, StatusCode::INTERNAL_SERVER_ERROR).await;
        assert_eq!(
            "error receiving object from S3 storage",
            error_response.error.message
        );
    }

    fn get_smithy_response() -> SmithyResponse {
        let sdk_body = "body";
        let status: SmithyStatusCode = 400.try_into().unwrap();
        SmithyResponse::new(status, sdk_body.into())
    }

    fn smithy_error(code: &str) -> SmithyError {
        SmithyError::builder()
            .message("fake smithy error")
            .code(code)
            .build()
    }

    // The cause chain of SDK errors is owned by the SDK, so only the status and message are
    // checked here.
    async fn test_s3_error(error: AircraftApiError, status: StatusCode, message: &str) {
        let error_response = error_response(error, status).await;
        assert_eq!(message, error_response.error.message);
    }

    #[tokio::test]
    async fn s3_get_object_no_such_bucket() {
        let get_object_error = GetObjectError::generic(smithy_error("NoSuchBucket"));
        let sdk_error = SdkError::service_error(get_object_error, get_smithy_response());
        let error = AircraftApiError::S3GetObject(sdk_error);
        let message = "error retrieving object from S3 storage";
        test_s3_error(error, StatusCode::BAD_REQUEST, message).await;
    }

    #[tokio::test]
    async fn s3_get_object_access_denied() {
        let get_object_error = GetObjectError::generic(smithy_error("AccessDenied"));
        let sdk_error = SdkError::service_error(get_object_error, get_smithy_response());
        let error = AircraftApiError::S3GetObject(sdk_error);
        let message = "error retrieving object from S3 storage";
        test_s3_error(error, StatusCode::UNAUTHORIZED, message).await;
    }

    #[tokio::test]
    async fn s3_list_objects_invalid_access_key() {
        let list_error = ListObjectsV2Error::generic(smithy_error("InvalidAccessKeyId"));
        let sdk_error = SdkError::service_error(list_error, get_smithy_response());
        let error = AircraftApiError::S3ListObjects(sdk_error);
        let message = "error listing objects in S3 storage";
        test_s3_error(error, StatusCode::UNAUTHORIZED, message).await;
    }

    #[tokio::test]
    async fn s3_put_object_sig_does_not_match() {
        let put_error = PutObjectError::generic(smithy_error("SignatureDoesNotMatch"));
        let sdk_error = SdkError::service_error(put_error, get_smithy_response());
        let error = AircraftApiError::S3PutObject(sdk_error);
        let message = "error storing object in S3 storage";
        test_s3_error(error, StatusCode::UNAUTHORIZED, message).await;
    }

    #[tokio::test]
    async fn s3_put_object_unknown_code() {
        let put_error = PutObjectError::generic(smithy_error("SlowDown"));
        let sdk_error = SdkError::service_error(put_error, get_smithy_response());
        let error = AircraftApiError::S3PutObject(sdk_error);
        let message = "error storing object in S3 storage";
        test_s3_error(error, StatusCode::INTERNAL_SERVER_ERROR, message).await;
    }
}
