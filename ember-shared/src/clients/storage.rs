use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;

/// S3-compatible object storage for user uploads.
#[derive(Clone)]
pub struct StorageClient {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl StorageClient {
    pub async fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "ember-storage");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = S3Client::from_conf(config);

        // Ignore "already exists"
        let _ = client.create_bucket().bucket(bucket).send().await;

        tracing::info!(endpoint = %endpoint, bucket = %bucket, "storage client initialized");

        Self {
            client,
            bucket: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload an object and return its public URL
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

        Ok(public_object_url(&self.public_url, &self.bucket, key))
    }

    pub async fn delete(&self, key: &str) -> Result<(), String> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| format!("delete failed: {e}"))?;

        Ok(())
    }

    /// Whether `url` points at an object in this bucket.
    pub fn owns_url(&self, url: &str) -> bool {
        object_key_from_url(&self.public_url, &self.bucket, url).is_some()
    }

    /// Delete the object behind a URL previously returned by [`upload`](Self::upload).
    /// URLs pointing elsewhere are ignored.
    pub async fn delete_by_url(&self, url: &str) -> Result<(), String> {
        match object_key_from_url(&self.public_url, &self.bucket, url) {
            Some(key) => self.delete(key).await,
            None => Ok(()),
        }
    }
}

fn public_object_url(public_url: &str, bucket: &str, key: &str) -> String {
    format!("{public_url}/{bucket}/{key}")
}

fn object_key_from_url<'a>(public_url: &str, bucket: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(public_url)?
        .strip_prefix('/')?
        .strip_prefix(bucket)?
        .strip_prefix('/')
        .filter(|key| !key.is_empty())
}

/// File extension for an accepted upload content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "audio/mpeg" => Some("mp3"),
        "audio/ogg" => Some("ogg"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_roundtrips_through_public_url() {
        let url = public_object_url("http://localhost:9000", "ember-media", "profiles/a/b.jpg");
        assert_eq!(
            object_key_from_url("http://localhost:9000", "ember-media", &url),
            Some("profiles/a/b.jpg")
        );
    }

    #[test]
    fn foreign_urls_have_no_key() {
        assert_eq!(
            object_key_from_url("http://localhost:9000", "ember-media", "https://cdn.example.com/x.jpg"),
            None
        );
        assert_eq!(
            object_key_from_url("http://localhost:9000", "ember-media", "http://localhost:9000/other/x.jpg"),
            None
        );
    }

    #[test]
    fn only_known_media_types_have_extensions() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("application/pdf"), None);
    }
}
