//! S3-compatible object storage provider.
//!
//! Works against AWS S3 and S3 clones (MinIO, OSS, R2) through a custom
//! endpoint. Vendor errors are classified by their error code into the
//! engine's error kinds before they leave this module.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use unifile_core::config::{ObjectStorageConfig, ProviderConfig};
use unifile_core::error::{AppError, ErrorKind};
use unifile_core::result::AppResult;
use unifile_core::traits::storage::{StorageProvider, StorageResult};
use unifile_core::types::{StorageType, UploadFileInfo};

use crate::chunked::{self, PartRange};

/// Client and settings fixed at initialization.
struct ObjectState {
    client: Client,
    config: ObjectStorageConfig,
}

/// S3-compatible object storage provider.
#[derive(Default)]
pub struct ObjectStorageProvider {
    state: OnceCell<ObjectState>,
}

impl std::fmt::Debug for ObjectStorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("ObjectStorageProvider");
        if let Some(state) = self.state.get() {
            s.field("bucket", &state.config.bucket)
                .field("region", &state.config.region)
                .field("endpoint", &state.config.endpoint);
        }
        s.field("initialized", &self.state.initialized()).finish()
    }
}

impl ObjectStorageProvider {
    /// Create an uninitialized provider.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> AppResult<&ObjectState> {
        self.state
            .get()
            .ok_or_else(|| AppError::provider_init("Object storage provider is not initialized"))
    }
}

impl ObjectState {
    async fn connect(config: &ObjectStorageConfig) -> AppResult<Self> {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::provider_init(format!(
                "Object storage configuration is missing: {}",
                missing.join(", ")
            )));
        }

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "unifile-config",
        );
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.timeout_seconds))
            .build();

        // Retries are the caller's decision, never the SDK's.
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .timeout_config(timeouts)
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            config: config.clone(),
        })
    }

    /// List a single key to prove the bucket exists and the credentials work.
    async fn test_connection(&self) -> AppResult<()> {
        self.client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| {
                let err = classify_sdk_error(e, "Object storage connection test failed");
                match err.kind {
                    ErrorKind::ProviderAuth | ErrorKind::ProviderInit => err,
                    _ => AppError::provider_init(err.message),
                }
            })?;
        Ok(())
    }

    /// Public URL of a key: custom domain, custom endpoint, or AWS host.
    fn public_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if let Some(domain) = &self.config.custom_domain {
            let scheme = if self.config.secure { "https" } else { "http" };
            let domain = domain
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/');
            return format!("{scheme}://{domain}/{key}");
        }
        match &self.config.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{key}",
                endpoint.trim_end_matches('/'),
                self.config.bucket
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{key}",
                self.config.bucket, self.config.region
            ),
        }
    }

    async fn put_single(&self, file: &UploadFileInfo, key: &str) -> AppResult<Option<String>> {
        let output = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(file.content_type())
            .content_length(file.size() as i64)
            .body(ByteStream::from(file.data.clone()))
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, &format!("Failed to upload {key}")))?;
        Ok(output.e_tag().map(str::to_string))
    }

    async fn put_multipart(&self, file: &UploadFileInfo, key: &str) -> AppResult<(Option<String>, u32)> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(file.content_type())
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, &format!("Failed to start multipart upload of {key}")))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| AppError::transfer("No upload ID returned for multipart upload"))?
            .to_string();

        let parts = chunked::plan_parts(file.size(), self.config.part_size_bytes);
        let part_count = parts.len() as u32;
        info!(
            key,
            parts = part_count,
            concurrency = self.config.part_concurrency,
            "Starting multipart upload"
        );

        let results: Vec<AppResult<CompletedPart>> = stream::iter(parts)
            .map(|part| self.put_part(key, &upload_id, part, &file.data))
            .buffer_unordered(self.config.part_concurrency.max(1))
            .collect()
            .await;

        let mut completed = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(part) => completed.push(part),
                Err(e) => {
                    self.abort_multipart(key, &upload_id).await;
                    return Err(e);
                }
            }
        }
        completed.sort_by_key(|p| p.part_number());

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&self.config.bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await;

        match output {
            Ok(output) => Ok((output.e_tag().map(str::to_string), part_count)),
            Err(e) => {
                self.abort_multipart(key, &upload_id).await;
                Err(classify_sdk_error(e, &format!("Failed to complete multipart upload of {key}")))
            }
        }
    }

    async fn put_part(
        &self,
        key: &str,
        upload_id: &str,
        part: PartRange,
        data: &Bytes,
    ) -> AppResult<CompletedPart> {
        let body = part.slice(data);
        let output = self
            .client
            .upload_part()
            .bucket(&self.config.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part.number as i32)
            .content_length(part.len as i64)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, &format!("Failed to upload part {} of {key}", part.number)))?;

        let etag = output
            .e_tag()
            .ok_or_else(|| AppError::transfer(format!("No ETag returned for part {}", part.number)))?;
        debug!(key, part = part.number, bytes = part.len, "Uploaded part");

        Ok(CompletedPart::builder()
            .part_number(part.number as i32)
            .e_tag(etag)
            .build())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) {
        if let Err(e) = self
            .client
            .abort_multipart_upload()
            .bucket(&self.config.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
        {
            warn!(key, upload_id, error = %DisplayErrorContext(&e), "Failed to abort multipart upload");
        }
    }

    async fn head(&self, key: &str) -> AppResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = classify_sdk_error(e, &format!("Failed to stat {key}"));
                if err.kind == ErrorKind::NotFound {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[async_trait]
impl StorageProvider for ObjectStorageProvider {
    fn storage_type(&self) -> StorageType {
        StorageType::Object
    }

    async fn initialize(&self, config: &ProviderConfig) -> AppResult<()> {
        let ProviderConfig::Object(config) = config else {
            return Err(AppError::provider_init(format!(
                "Object storage provider received {} configuration",
                config.storage_type()
            )));
        };
        if self.state.initialized() {
            return Ok(());
        }

        let state = ObjectState::connect(config).await?;
        state.test_connection().await?;
        info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "Object storage provider initialized"
        );
        let _ = self.state.set(state);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state.initialized()
    }

    async fn upload(&self, file: &UploadFileInfo, path: &str) -> AppResult<StorageResult> {
        let state = self.state()?;
        let key = path.trim_start_matches('/');
        let start = Instant::now();

        let result = if file.size() > state.config.multipart_threshold_bytes {
            state.put_multipart(file, key).await
        } else {
            state.put_single(file, key).await.map(|etag| (etag, 1))
        };
        let (etag, part_count) = result.inspect_err(|e| {
            error!(
                bucket = %state.config.bucket,
                key,
                size_bytes = file.size(),
                error = %e,
                "Object upload failed"
            );
        })?;

        info!(
            bucket = %state.config.bucket,
            key,
            size_bytes = file.size(),
            part_count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object upload successful"
        );

        Ok(StorageResult {
            path: key.to_string(),
            url: Some(state.public_url(key)),
            size_bytes: file.size(),
            etag,
            part_count,
        })
    }

    async fn download(&self, path: &str) -> AppResult<Bytes> {
        let state = self.state()?;
        let key = path.trim_start_matches('/');
        let response = state
            .client
            .get_object()
            .bucket(&state.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, &format!("Failed to download {key}")))?;

        let data = response.body.collect().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transfer,
                format!("Failed to read body of {key}"),
                e,
            )
        })?;
        let bytes = data.into_bytes();
        debug!(key, size_bytes = bytes.len(), "Object download successful");
        Ok(bytes)
    }

    async fn delete(&self, path: &str) -> AppResult<StorageResult> {
        let state = self.state()?;
        let key = path.trim_start_matches('/');
        if let Err(e) = state
            .client
            .delete_object()
            .bucket(&state.config.bucket)
            .key(key)
            .send()
            .await
        {
            let err = classify_sdk_error(e, &format!("Failed to delete {key}"));
            if err.kind != ErrorKind::NotFound {
                return Err(err);
            }
            debug!(key, "Delete of missing object treated as success");
        }
        Ok(StorageResult {
            path: key.to_string(),
            url: None,
            size_bytes: 0,
            etag: None,
            part_count: 0,
        })
    }

    async fn get_access_url(&self, path: &str, expires_in: Option<Duration>) -> AppResult<String> {
        let state = self.state()?;
        let key = path.trim_start_matches('/');
        if !state.head(key).await? {
            return Err(AppError::not_found(format!("Object not found: {key}")));
        }
        if state.config.custom_domain.is_some() {
            return Ok(state.public_url(key));
        }

        let expires_in = expires_in
            .unwrap_or_else(|| Duration::from_secs(state.config.signed_url_expiry_seconds));
        let presigning = PresigningConfig::expires_in(expires_in).map_err(|e| {
            AppError::with_source(
                ErrorKind::Validation,
                format!("Invalid URL expiry {}s", expires_in.as_secs()),
                e,
            )
        })?;
        let request = state
            .client
            .get_object()
            .bucket(&state.config.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| classify_sdk_error(e, &format!("Failed to sign URL for {key}")))?;
        Ok(request.uri().to_string())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let state = self.state()?;
        state.head(path.trim_start_matches('/')).await
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<String>> {
        let state = self.state()?;
        let prefix = prefix.trim_start_matches('/');
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = state
                .client
                .list_objects_v2()
                .bucket(&state.config.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| classify_sdk_error(e, &format!("Failed to list {prefix}")))?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let state = self.state()?;
        Ok(state.test_connection().await.is_ok())
    }
}

/// Normalize an SDK error into the engine taxonomy.
fn classify_sdk_error<E, R>(err: SdkError<E, R>, context: &str) -> AppError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let kind = match &err {
        SdkError::ConstructionFailure(_) => ErrorKind::ProviderInit,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ErrorKind::Transfer
        }
        _ => classify_code(err.code()),
    };
    let detail = match err.code() {
        Some(code) => format!("{code}: {}", err.message().unwrap_or("no message")),
        None => DisplayErrorContext(&err).to_string(),
    };
    AppError::with_source(kind, format!("{context}: {detail}"), err)
}

/// Map an S3 error code to an error kind.
fn classify_code(code: Option<&str>) -> ErrorKind {
    match code {
        Some("NoSuchKey" | "NotFound" | "NoSuchUpload" | "404") => ErrorKind::NotFound,
        Some(
            "InvalidAccessKeyId"
            | "SignatureDoesNotMatch"
            | "AccessDenied"
            | "ExpiredToken"
            | "InvalidToken"
            | "403",
        ) => ErrorKind::ProviderAuth,
        Some("NoSuchBucket" | "InvalidBucketName" | "AuthorizationHeaderMalformed") => {
            ErrorKind::ProviderInit
        }
        _ => ErrorKind::Transfer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_code() {
        assert_eq!(classify_code(Some("NoSuchKey")), ErrorKind::NotFound);
        assert_eq!(classify_code(Some("NotFound")), ErrorKind::NotFound);
        assert_eq!(classify_code(Some("InvalidAccessKeyId")), ErrorKind::ProviderAuth);
        assert_eq!(classify_code(Some("SignatureDoesNotMatch")), ErrorKind::ProviderAuth);
        assert_eq!(classify_code(Some("NoSuchBucket")), ErrorKind::ProviderInit);
        assert_eq!(classify_code(Some("SlowDown")), ErrorKind::Transfer);
        assert_eq!(classify_code(None), ErrorKind::Transfer);
    }

    #[tokio::test]
    async fn test_missing_fields_fail_initialization() {
        let provider = ObjectStorageProvider::new();
        let config = ObjectStorageConfig {
            bucket: "media".into(),
            ..ObjectStorageConfig::default()
        };
        let err = provider
            .initialize(&ProviderConfig::Object(config))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProviderInit);
        assert!(err.message.contains("access_key"));
        assert!(!provider.is_initialized());
    }

    #[tokio::test]
    async fn test_operations_require_initialization() {
        let provider = ObjectStorageProvider::new();
        let err = provider.exists("a").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProviderInit);
    }

    async fn state_with(tweak: impl FnOnce(&mut ObjectStorageConfig)) -> ObjectState {
        let mut config = ObjectStorageConfig {
            enabled: true,
            region: "eu-west-1".into(),
            bucket: "media".into(),
            access_key: "AKIDEXAMPLE".into(),
            secret_key: "secret".into(),
            ..ObjectStorageConfig::default()
        };
        tweak(&mut config);
        ObjectState::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_public_url_forms() {
        let aws = state_with(|_| {}).await;
        assert_eq!(
            aws.public_url("m/a.png"),
            "https://media.s3.eu-west-1.amazonaws.com/m/a.png"
        );

        let minio = state_with(|c| c.endpoint = Some("http://localhost:9000/".into())).await;
        assert_eq!(minio.public_url("/m/a.png"), "http://localhost:9000/media/m/a.png");

        let cdn = state_with(|c| {
            c.custom_domain = Some("https://static.example.com/".into());
            c.secure = false;
        })
        .await;
        assert_eq!(cdn.public_url("m/a.png"), "http://static.example.com/m/a.png");
    }
}
