use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use super::{DeleteError, ObjectStorage, StorageError, StoredObject, UploadError};
use crate::core::config::Settings;

#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
}

impl S3ObjectStorage {
    pub async fn from_settings(settings: &Settings) -> Self {
        let creds = Credentials::new(
            settings.s3().access_key.clone(),
            settings.s3().secret_key.clone(),
            None,
            None,
            "alfred-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(settings.s3().endpoint.clone())
            .region(aws_config::Region::new(settings.s3().region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        Self { client: Client::new(&config), bucket: settings.s3().bucket.clone() }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    fn backend(&self) -> &'static str {
        "s3"
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<StoredObject, UploadError> {
        let object = StoredObject::describe(&bytes);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type("application/octet-stream")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| UploadError::Failed {
                path: path.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        Ok(object)
    }

    async fn delete(&self, path: &str) -> Result<(), DeleteError> {
        self.client.delete_object().bucket(&self.bucket).key(path).send().await.map_err(
            |err| DeleteError::Failed {
                path: path.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            },
        )?;

        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self.client.head_object().bucket(&self.bucket).key(path).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|service| service.is_not_found()) => {
                Ok(false)
            }
            Err(err) => Err(StorageError::Failed {
                path: path.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            }),
        }
    }
}
