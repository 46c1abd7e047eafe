//! Assets a member declares on their profile. Listing is always scoped to
//! one member profile.

use shared::{MemberAsset, MemberAssetRequest, PaginatedResult, PaginationQuery};

use crate::hooks::query_cache::QueryCache;
use crate::hooks::use_resource::{create_data_layer, DataLayer, QueryOptions};
use crate::services::api::ApiClient;
use crate::services::error::ApiError;

pub const RESOURCE: &str = "member-asset";

pub type MemberAssetDataLayer = DataLayer<MemberAsset, MemberAssetRequest>;

pub fn data_layer(client: ApiClient, cache: QueryCache) -> MemberAssetDataLayer {
    create_data_layer(client, cache, RESOURCE)
}

pub fn member_profile_path(member_profile_id: &str) -> String {
    format!("member-profile/{}", member_profile_id)
}

/// `GET /member-asset/member-profile/{id}/search`
pub async fn get_by_member_profile(
    layer: &MemberAssetDataLayer,
    member_profile_id: &str,
    query: &PaginationQuery,
    options: QueryOptions<PaginatedResult<MemberAsset>>,
) -> Result<Option<PaginatedResult<MemberAsset>>, ApiError> {
    layer
        .get_paginated_at(&member_profile_path(member_profile_id), query, options)
        .await
}
