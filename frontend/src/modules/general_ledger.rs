//! Read-only views over the general ledger. Posting happens server-side, so
//! this module only knows which search path serves which ledger.

use std::fmt;

use shared::{GeneralLedgerEntry, PaginatedResult, PaginationQuery};

use crate::hooks::query_cache::QueryCache;
use crate::hooks::use_resource::{create_data_layer, DataLayer, NoPayload, QueryOptions};
use crate::services::api::ApiClient;
use crate::services::error::ApiError;

pub const RESOURCE: &str = "general-ledger";

pub type GeneralLedgerDataLayer = DataLayer<GeneralLedgerEntry, NoPayload>;

pub fn data_layer(client: ApiClient, cache: QueryCache) -> GeneralLedgerDataLayer {
    create_data_layer(client, cache, RESOURCE)
}

/// Which ledger to read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerView {
    /// Everything posted on the signed-in branch
    Branch,
    MemberProfile(String),
    Account(String),
    MemberProfileAccount {
        member_profile_id: String,
        account_id: String,
    },
    TransactionBatch(String),
}

impl LedgerView {
    /// Sub-path under the resource, before `/search`
    pub fn sub_path(&self) -> String {
        match self {
            LedgerView::Branch => "branch".to_string(),
            LedgerView::MemberProfile(id) => format!("member-profile/{}", id),
            LedgerView::Account(id) => format!("account/{}", id),
            LedgerView::MemberProfileAccount {
                member_profile_id,
                account_id,
            } => format!("member-profile/{}/account/{}", member_profile_id, account_id),
            LedgerView::TransactionBatch(id) => format!("transaction-batch/{}", id),
        }
    }
}

impl fmt::Display for LedgerView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/search", RESOURCE, self.sub_path())
    }
}

pub async fn get_ledger(
    layer: &GeneralLedgerDataLayer,
    view: &LedgerView,
    query: &PaginationQuery,
    options: QueryOptions<PaginatedResult<GeneralLedgerEntry>>,
) -> Result<Option<PaginatedResult<GeneralLedgerEntry>>, ApiError> {
    layer.get_paginated_at(&view.sub_path(), query, options).await
}

/// Debit and credit totals of one page
pub fn page_totals(entries: &[GeneralLedgerEntry]) -> (f64, f64) {
    entries
        .iter()
        .fold((0.0, 0.0), |(debit, credit), e| (debit + e.debit, credit + e.credit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingTransport;
    use reqwest::Method;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;

    #[rstest]
    #[case(LedgerView::Branch, "general-ledger/branch/search")]
    #[case(LedgerView::MemberProfile("mp-1".into()), "general-ledger/member-profile/mp-1/search")]
    #[case(LedgerView::Account("acc-9".into()), "general-ledger/account/acc-9/search")]
    #[case(
        LedgerView::MemberProfileAccount { member_profile_id: "mp-1".into(), account_id: "acc-9".into() },
        "general-ledger/member-profile/mp-1/account/acc-9/search"
    )]
    #[case(LedgerView::TransactionBatch("tb-3".into()), "general-ledger/transaction-batch/tb-3/search")]
    fn test_ledger_paths(#[case] view: LedgerView, #[case] expected: &str) {
        assert_eq!(view.to_string(), expected);
    }

    #[tokio::test]
    async fn test_views_are_cached_separately() {
        let transport = Arc::new(RecordingTransport::new());
        let entry = json!({
            "id": "gl-1",
            "account_id": "acc-9",
            "reference_number": "OR-001",
            "source": "deposit",
            "entry_date": "2024-02-01T08:00:00Z",
            "debit": 500.0,
            "credit": 0.0,
            "balance": 500.0,
            "organization_id": "org-1",
            "branch_id": "br-1",
            "created_at": "2024-02-01T08:00:00Z",
            "updated_at": "2024-02-01T08:00:00Z"
        });
        let page = json!({
            "data": [entry],
            "pageIndex": 0,
            "totalPage": 1,
            "pageSize": 10,
            "totalSize": 1
        });
        transport.respond(Method::GET, "general-ledger/branch/search", page.clone());
        transport.respond(Method::GET, "general-ledger/account/acc-9/search", page);
        let layer = data_layer(ApiClient::new(transport.clone()), QueryCache::default());
        let query = PaginationQuery::default();

        for view in [LedgerView::Branch, LedgerView::Account("acc-9".into()), LedgerView::Branch] {
            get_ledger(&layer, &view, &query, QueryOptions::new()).await.unwrap();
        }

        assert_eq!(transport.count(Method::GET, "general-ledger/branch/search"), 1);
        assert_eq!(transport.count(Method::GET, "general-ledger/account/acc-9/search"), 1);

        let cached = layer
            .cache()
            .get::<crate::hooks::reducer::QueryData<GeneralLedgerEntry>>(
                &layer.keys().paginated_at("branch", &query),
            )
            .and_then(|d| d.into_page())
            .unwrap();
        assert_eq!(page_totals(&cached.data), (500.0, 0.0));
    }
}
