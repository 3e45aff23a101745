// crates/unzip-relay-server/src/object_store.rs
// ============================================================================
// Module: S3 Object Store
// Description: S3-backed source and destination store implementations.
// Purpose: Stream archives from and extracted objects to S3-compatible stores.
// Dependencies: aws-config, aws-sdk-s3, unzip-relay-core
// ============================================================================

//! ## Overview
//! [`S3ObjectStore`] implements both store interfaces against any
//! S3-compatible backend. Reads stream the object body; writes stage bytes
//! into bounded parts and use multipart upload once the first part boundary
//! is crossed, so an aborted write never becomes an externally visible
//! object: an incomplete multipart upload is invisible until completed, and
//! small objects fall back to a single put on finalize.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::CompletedMultipartUpload;
use aws_sdk_s3::types::CompletedPart;
use unzip_relay_config::DestinationStoreConfig;
use unzip_relay_config::SourceStoreConfig;
use unzip_relay_core::interfaces::DestinationStore;
use unzip_relay_core::interfaces::ObjectWriter;
use unzip_relay_core::interfaces::SourceStore;
use unzip_relay_core::interfaces::SourceStream;
use unzip_relay_core::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Part boundary for multipart staging (the S3 minimum part size is 5 MiB).
const MULTIPART_PART_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Store
// ============================================================================

/// S3-backed object store client.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    /// Underlying S3 client.
    client: Client,
}

impl S3ObjectStore {
    /// Connects a client for the configured source store.
    pub async fn from_source_config(config: &SourceStoreConfig) -> Self {
        Self::connect(config.region.clone(), config.endpoint.clone(), config.force_path_style)
            .await
    }

    /// Connects a client for the configured destination store.
    pub async fn from_destination_config(config: &DestinationStoreConfig) -> Self {
        Self::connect(config.region.clone(), config.endpoint.clone(), config.force_path_style)
            .await
    }

    /// Connects a client with explicit region and endpoint settings.
    pub async fn connect(
        region: Option<String>,
        endpoint: Option<String>,
        force_path_style: bool,
    ) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if force_path_style {
            builder = builder.force_path_style(true);
        }
        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl SourceStore for S3ObjectStore {
    async fn open_read(&self, bucket: &str, key: &str) -> Result<SourceStream, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify_sdk_error(&err, bucket, key))?;
        Ok(Box::pin(output.body.into_async_read()))
    }
}

#[async_trait]
impl DestinationStore for S3ObjectStore {
    async fn open_write(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn ObjectWriter>, StoreError> {
        Ok(Box::new(S3ObjectWriter {
            client: self.client.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            staged: Vec::new(),
            upload_id: None,
            parts: Vec::new(),
        }))
    }
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Staging writer for one destination object.
///
/// # Invariants
/// - Bytes become externally visible only on `finalize`: either through a
///   single put for small objects or by completing the multipart upload.
/// - `abort` discards the staged buffer and aborts any open multipart
///   upload, so nothing half-written is ever listed.
struct S3ObjectWriter {
    /// S3 client shared with the owning store.
    client: Client,
    /// Destination bucket.
    bucket: String,
    /// Destination key.
    key: String,
    /// Bytes staged for the next part (bounded by the part boundary plus
    /// one write chunk).
    staged: Vec<u8>,
    /// Multipart upload identifier once the first part boundary is crossed.
    upload_id: Option<String>,
    /// Parts uploaded so far.
    parts: Vec<CompletedPart>,
}

impl S3ObjectWriter {
    /// Ensures a multipart upload exists, returning its identifier.
    async fn ensure_upload(&mut self) -> Result<String, StoreError> {
        if let Some(upload_id) = &self.upload_id {
            return Ok(upload_id.clone());
        }
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(|err| classify_sdk_error(&err, &self.bucket, &self.key))?;
        let upload_id = output
            .upload_id()
            .ok_or_else(|| StoreError::Io("multipart upload id missing".to_string()))?
            .to_string();
        self.upload_id = Some(upload_id.clone());
        Ok(upload_id)
    }

    /// Uploads the staged buffer as the next part.
    async fn flush_part(&mut self) -> Result<(), StoreError> {
        let upload_id = self.ensure_upload().await?;
        let part_number = i32::try_from(self.parts.len() + 1)
            .map_err(|_| StoreError::Io("part count overflow".to_string()))?;
        let body = ByteStream::from(std::mem::take(&mut self.staged));
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(body)
            .send()
            .await
            .map_err(|err| classify_sdk_error(&err, &self.bucket, &self.key))?;
        self.parts.push(
            CompletedPart::builder()
                .part_number(part_number)
                .set_e_tag(output.e_tag().map(str::to_string))
                .build(),
        );
        Ok(())
    }
}

#[async_trait]
impl ObjectWriter for S3ObjectWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StoreError> {
        self.staged.extend_from_slice(chunk);
        if self.staged.len() >= MULTIPART_PART_BYTES {
            self.flush_part().await?;
        }
        Ok(())
    }

    async fn finalize(mut self: Box<Self>) -> Result<(), StoreError> {
        let Some(upload_id) = self.upload_id.clone() else {
            let body = ByteStream::from(std::mem::take(&mut self.staged));
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&self.key)
                .body(body)
                .send()
                .await
                .map_err(|err| classify_sdk_error(&err, &self.bucket, &self.key))?;
            return Ok(());
        };
        if !self.staged.is_empty() {
            self.flush_part().await?;
        }
        let completed =
            CompletedMultipartUpload::builder().set_parts(Some(self.parts.clone())).build();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|err| classify_sdk_error(&err, &self.bucket, &self.key))?;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        let Some(upload_id) = self.upload_id else {
            return Ok(());
        };
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|err| classify_sdk_error(&err, &self.bucket, &self.key))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Error Classification
// ============================================================================

/// Maps an SDK error onto the store error taxonomy.
///
/// Transport-level failures (dispatch, timeout, malformed responses) are
/// transient; service errors are classified by their error code, defaulting
/// to a non-transient I/O error for unknown codes.
fn classify_sdk_error<E>(err: &SdkError<E>, bucket: &str, key: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(context) => match context.err().code().unwrap_or_default() {
            "NoSuchKey" | "NoSuchBucket" | "NotFound" => StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" => {
                StoreError::AccessDenied {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            }
            "QuotaExceeded" => StoreError::QuotaExceeded {
                bucket: bucket.to_string(),
            },
            "SlowDown" | "ServiceUnavailable" | "InternalError" => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Io(err.to_string()),
        },
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Io(err.to_string()),
    }
}
