use crate::config::env::StorageSettings;
use crate::core::{ObjectMeta, Storage};
use crate::utils::error::{EtlError, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Builds a client for the configured region. An endpoint override
    /// (MinIO, LocalStack) switches to path-style addressing.
    pub async fn from_settings(settings: &StorageSettings) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(S3Client::from_conf(builder.build()), settings.bucket.clone())
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, key: &str) -> Result<Vec<u8>> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_no_such_key() || err.code() == Some("NoSuchKey") {
                    return Err(EtlError::SourceNotFound {
                        location: self.describe(key),
                    });
                }
                return Err(EtlError::StorageFailure {
                    message: format!("GetObject {} failed: {}", self.describe(key), err),
                });
            }
        };

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| EtlError::StorageFailure {
                message: format!("Failed to read body of {}: {}", self.describe(key), e),
            })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, key: &str, data: &[u8], meta: &ObjectMeta) -> Result<()> {
        let metadata: HashMap<String, String> = meta
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data.to_vec()))
            .content_type(&meta.content_type)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| EtlError::StorageFailure {
                message: format!(
                    "PutObject {} failed: {}",
                    self.describe(key),
                    e.into_service_error()
                ),
            })?;

        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}
