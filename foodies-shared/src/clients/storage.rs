use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;
use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};

#[derive(Clone)]
pub struct MinioClient {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl MinioClient {
    pub async fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "foodies");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = S3Client::from_conf(config);

        // Ensure bucket exists
        let _ = client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await;

        tracing::info!(endpoint = %endpoint, bucket = %bucket, "object storage client initialized");

        Self {
            client,
            bucket: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload a file and return the public URL
    pub async fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| format!("upload failed: {e}"))?;

        Ok(format!("{}/{}/{}", self.public_url, self.bucket, key))
    }
}

/// Image upload collaborator. Without object storage credentials images are
/// embedded in the returned value as a `data:` URI instead.
#[derive(Clone)]
pub enum ImageStore {
    Remote(MinioClient),
    Inline,
}

impl ImageStore {
    pub fn is_configured(&self) -> bool {
        matches!(self, ImageStore::Remote(_))
    }

    /// Stores `body` under `folder` and returns the URL to persist.
    pub async fn store(&self, folder: &str, body: Vec<u8>, content_type: &str) -> AppResult<String> {
        let ext = image_extension(content_type)?;
        match self {
            ImageStore::Remote(client) => {
                let key = format!("{}/{}.{}", folder.trim_matches('/'), Uuid::now_v7(), ext);
                let url = client
                    .upload(&key, body, content_type)
                    .await
                    .map_err(|e| {
                        tracing::error!(error = %e, key = %key, "image upload failed");
                        AppError::new(ErrorCode::ImageUploadFailed, "Image upload failed")
                    })?;
                tracing::info!(key = %key, "image uploaded");
                Ok(url)
            }
            ImageStore::Inline => Ok(data_uri(content_type, &body)),
        }
    }
}

pub fn image_extension(content_type: &str) -> AppResult<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "image/gif" => Ok("gif"),
        _ => Err(AppError::new(
            ErrorCode::UnsupportedImage,
            "Unsupported image format, accepted: jpeg, png, webp, gif",
        )),
    }
}

pub fn data_uri(content_type: &str, body: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_embeds_base64() {
        assert_eq!(data_uri("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn rejects_non_images() {
        assert!(image_extension("application/pdf").is_err());
        assert_eq!(image_extension("image/jpeg").unwrap(), "jpg");
    }

    #[tokio::test]
    async fn inline_store_falls_back_to_data_uri() {
        let store = ImageStore::Inline;
        assert!(!store.is_configured());
        let url = store.store("foodies/avatars", b"abc".to_vec(), "image/gif").await.unwrap();
        assert_eq!(url, "data:image/gif;base64,YWJj");
    }
}
