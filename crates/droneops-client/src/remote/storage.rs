//! Blob-upload facility.

use reqwest::header;

use super::{RemoteClient, RemoteError};

impl RemoteClient {
    /// Upload `bytes` into `bucket` under `object_name` and return the
    /// public URL it can be retrieved from.
    pub async fn upload(
        &self,
        bucket: &str,
        object_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, RemoteError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, object_name);
        let request = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, content_type.to_string())
            .body(bytes);
        Self::check(self.apply_headers(request).send().await?).await?;
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, object_name
        ))
    }
}
