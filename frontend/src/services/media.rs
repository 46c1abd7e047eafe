use shared::Media;
use tracing::info;

use crate::services::api::{ApiClient, MediaUpload};
use crate::services::error::ApiError;

pub const MEDIA_RESOURCE: &str = "media";

/// Image and signature fields store a media id; the file itself goes
/// through this endpoint first.
#[derive(Clone)]
pub struct MediaService {
    client: ApiClient,
}

impl MediaService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Send one file as multipart form-data and return its descriptor
    pub async fn upload(&self, upload: MediaUpload) -> Result<Media, ApiError> {
        if upload.bytes.is_empty() {
            let mut errors = shared::ValidationErrors::new();
            errors.add("file", "File is empty");
            return Err(ApiError::Validation(errors));
        }
        let media: Media = self.client.upload(MEDIA_RESOURCE, upload).await?;
        info!(media_id = %media.id, file_name = %media.file_name, "media uploaded");
        Ok(media)
    }
}
