//! S3 adapter for the object-storage probe port.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};

use crate::domain::ports::{ObjectStore, ObjectStoreError};
use crate::domain::source::SourceLocation;

/// Object-storage port implementation over the S3 client.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Wrap an S3 client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn probe(&self, location: &SourceLocation) -> Result<u64, ObjectStoreError> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(location.bucket())
            .max_keys(1000);
        if !location.prefix().is_empty() {
            request = request.prefix(location.prefix());
        }
        let output = request.send().await.map_err(map_storage_error)?;
        Ok(output.contents().len() as u64)
    }
}

fn map_storage_error<E>(error: SdkError<E>) -> ObjectStoreError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
{
    match &error {
        SdkError::ServiceError(service_err) => {
            let code = service_err.err().code().unwrap_or_default().to_owned();
            let message = service_err
                .err()
                .message()
                .map_or_else(|| format!("{error:?}"), str::to_owned);
            let status = service_err.raw().status().as_u16();
            match code.as_str() {
                "NoSuchBucket" => ObjectStoreError::not_found(message),
                "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" => {
                    ObjectStoreError::unauthorized(message)
                }
                _ if status == 404 => ObjectStoreError::not_found(message),
                _ if status == 403 => ObjectStoreError::unauthorized(message),
                _ => ObjectStoreError::api(format!("{code}: {message}")),
            }
        }
        _ => ObjectStoreError::api(format!("{error:?}")),
    }
}
