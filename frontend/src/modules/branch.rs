use shared::{Branch, BranchRequest};

use crate::hooks::query_cache::QueryCache;
use crate::hooks::use_resource::{create_data_layer, DataLayer};
use crate::services::api::ApiClient;

pub const RESOURCE: &str = "branch";

pub type BranchDataLayer = DataLayer<Branch, BranchRequest>;

pub fn data_layer(client: ApiClient, cache: QueryCache) -> BranchDataLayer {
    create_data_layer(client, cache, RESOURCE)
}
