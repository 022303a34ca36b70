//! Mission media uploads.

use std::sync::Arc;

use chrono::Utc;
use droneops_core::{Error, Result};
use tracing::warn;

use crate::Backend;

const MISSION_BUCKET: &str = "mission-files";

pub struct MediaApi {
    backend: Arc<Backend>,
}

impl MediaApi {
    pub(crate) fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    /// Store a mission file and return a URL or path it can be retrieved
    /// from. Remote uploads that fail fall back to the local media
    /// directory.
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let object_name = format!("{}_{}", Utc::now().timestamp_millis(), file_name);

        if let Some(remote) = self.backend.remote() {
            match remote
                .upload(MISSION_BUCKET, &object_name, bytes.clone(), content_type)
                .await
            {
                Ok(url) => return Ok(url),
                Err(err) => warn!(error = %err, "remote upload failed, storing locally"),
            }
        }

        let dir = &self.backend.media_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|err| Error::Generic(format!("Could not create media directory: {err}")))?;
        let path = dir.join(&object_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|err| Error::Generic(format!("Could not store media file: {err}")))?;
        Ok(path.to_string_lossy().into_owned())
    }
}
