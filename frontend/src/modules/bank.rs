use shared::validation::Schema;
use shared::{Bank, BankRequest};
use tracing::warn;

use crate::hooks::query_cache::QueryCache;
use crate::hooks::use_resource::{create_data_layer, DataLayer, MutationOptions};
use crate::services::api::{ApiClient, MediaUpload};
use crate::services::error::ApiError;
use crate::services::media::MediaService;

pub const RESOURCE: &str = "bank";

pub type BankDataLayer = DataLayer<Bank, BankRequest>;

pub fn data_layer(client: ApiClient, cache: QueryCache) -> BankDataLayer {
    create_data_layer(client, cache, RESOURCE)
}

/// Create a bank, uploading its logo first when one was picked.
///
/// The payload is validated before the upload so a rejected form never
/// leaves a file behind. If the create call fails after the upload went
/// through, the uploaded media stays orphaned on the server.
pub async fn create_with_media(
    layer: &BankDataLayer,
    media: &MediaService,
    request: BankRequest,
    logo: Option<MediaUpload>,
    options: MutationOptions<Bank>,
) -> Result<Bank, ApiError> {
    let mut request = request.parse()?;
    if let Some(logo) = logo {
        let uploaded = media.upload(logo).await?;
        request.media_id = Some(uploaded.id);
    }

    let media_id = request.media_id.clone();
    layer.create(request, options).await.map_err(|e| {
        if let Some(media_id) = media_id {
            warn!(media_id = %media_id, error = %e, "bank create failed after media upload");
        }
        e
    })
}
