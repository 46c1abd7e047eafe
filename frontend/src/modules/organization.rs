use shared::{Organization, OrganizationRequest};

use crate::hooks::query_cache::QueryCache;
use crate::hooks::use_resource::{create_data_layer, DataLayer};
use crate::services::api::ApiClient;

pub const RESOURCE: &str = "organization";

pub type OrganizationDataLayer = DataLayer<Organization, OrganizationRequest>;

pub fn data_layer(client: ApiClient, cache: QueryCache) -> OrganizationDataLayer {
    create_data_layer(client, cache, RESOURCE)
}
