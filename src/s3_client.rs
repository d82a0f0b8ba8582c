//! A simplified S3 client that supports storing, listing and downloading objects.
//! It attempts to hide the complexities of working with the AWS SDK for S3.

use crate::cli::CommandLineArgs;
use crate::error::AircraftApiError;
use crate::object_store::ObjectStore;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use axum::body::Bytes;
use tracing::Instrument;
use url::Url;

#[derive(Clone, Eq, Hash, PartialEq)]
pub enum S3Credentials {
    AccessKey {
        access_key: String,
        secret_key: String,
        session_token: Option<String>,
    },
    None,
}

impl S3Credentials {
    /// Create an access key credential.
    pub fn access_key(access_key: &str, secret_key: &str) -> Self {
        S3Credentials::AccessKey {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            session_token: None,
        }
    }

    /// Create credentials from command line arguments.
    ///
    /// Keys not provided as arguments are read from the standard `AWS_ACCESS_KEY_ID`,
    /// `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN` environment variables.
    pub fn from_args(args: &CommandLineArgs) -> Self {
        let env = |name: &str| std::env::var(name).ok();
        Self::from_keys(
            args.s3_access_key
                .clone()
                .or_else(|| env("AWS_ACCESS_KEY_ID")),
            args.s3_secret_key
                .clone()
                .or_else(|| env("AWS_SECRET_ACCESS_KEY")),
            args.s3_session_token
                .clone()
                .or_else(|| env("AWS_SESSION_TOKEN")),
        )
    }

    /// Both an access key and a secret key are required for access key credentials.
    fn from_keys(
        access_key: Option<String>,
        secret_key: Option<String>,
        session_token: Option<String>,
    ) -> Self {
        match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => S3Credentials::AccessKey {
                access_key,
                secret_key,
                session_token,
            },
            _ => S3Credentials::None,
        }
    }
}

/// S3 client object.
#[derive(Clone, Debug)]
pub struct S3Client {
    /// Underlying AWS SDK S3 client object.
    client: Client,
}

impl S3Client {
    /// Creates an S3Client object
    ///
    /// # Arguments
    ///
    /// * `url`: Optional object storage API URL. AWS endpoint resolution is used if not set.
    /// * `region`: Object storage region
    /// * `credentials`: Object storage account credentials
    pub async fn new(url: Option<&Url>, region: &str, credentials: S3Credentials) -> Self {
        let region = Region::new(region.to_string());
        let builder = aws_sdk_s3::Config::builder().behavior_version(BehaviorVersion::latest());
        let builder = match credentials {
            S3Credentials::AccessKey {
                access_key,
                secret_key,
                session_token,
            } => {
                let credentials = Credentials::from_keys(access_key, secret_key, session_token);
                builder.credentials_provider(credentials)
            }
            S3Credentials::None => builder,
        };
        let builder = match url {
            Some(url) => builder.endpoint_url(url.to_string()).force_path_style(true),
            None => builder,
        };
        let s3_config = builder.region(Some(region)).build();
        let client = Client::from_conf(s3_config);
        Self { client }
    }

    /// Creates an S3Client object from command line arguments.
    pub async fn from_args(args: &CommandLineArgs) -> Self {
        if let Some(url) = &args.s3_endpoint {
            tracing::info!("Creating new S3 client for {}", url);
        } else {
            tracing::info!("Creating new S3 client for region {}", args.s3_region);
        }
        Self::new(
            args.s3_endpoint.as_ref(),
            &args.s3_region,
            S3Credentials::from_args(args),
        )
        .await
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    #[tracing::instrument(level = "DEBUG", skip(self, body), fields(size = body.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> Result<(), AircraftApiError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .instrument(tracing::Span::current())
            .await?;
        Ok(())
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, AircraftApiError> {
        let mut keys = Vec::new();
        let mut continuation_token = None;
        // Each response holds at most 1000 keys. Follow continuation tokens until the listing
        // is complete.
        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .instrument(tracing::Span::current())
                .await?;
            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
            continuation_token = response.next_continuation_token().map(str::to_string);
            if !response.is_truncated().unwrap_or(false) || continuation_token.is_none() {
                break;
            }
        }
        Ok(keys)
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, AircraftApiError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .instrument(tracing::Span::current())
            .await?;
        let data = response
            .body
            .collect()
            .instrument(tracing::Span::current())
            .await?;
        Ok(data.into_bytes())
    }
}
