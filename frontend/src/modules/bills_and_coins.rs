//! Cash denominations counted at the teller window

use shared::{BillsAndCoin, BillsAndCoinRequest};

use crate::hooks::query_cache::QueryCache;
use crate::hooks::use_resource::{create_data_layer, DataLayer};
use crate::services::api::ApiClient;

pub const RESOURCE: &str = "bills-and-coins";

pub type BillsAndCoinDataLayer = DataLayer<BillsAndCoin, BillsAndCoinRequest>;

pub fn data_layer(client: ApiClient, cache: QueryCache) -> BillsAndCoinDataLayer {
    create_data_layer(client, cache, RESOURCE)
}

/// Face value of a counted stack of one denomination
pub fn stack_total(denomination: &BillsAndCoin, count: u32) -> f64 {
    denomination.value * f64::from(count)
}
