//! Journal vouchers move through `draft -> printed -> approved -> released`.
//! Each step is its own endpoint; the approval board groups vouchers into
//! one column per status.

use std::fmt;

use shared::models::Entity;
use shared::{JournalVoucher, JournalVoucherRequest, JournalVoucherStatus, ValidationErrors};
use tracing::info;

use crate::hooks::query_cache::QueryCache;
use crate::hooks::reducer::ResourceChange;
use crate::hooks::use_resource::{create_data_layer, DataLayer, MutationOptions};
use crate::services::api::{ApiClient, ApiRequest};
use crate::services::error::ApiError;

pub const RESOURCE: &str = "journal-voucher";

pub type JournalVoucherDataLayer = DataLayer<JournalVoucher, JournalVoucherRequest>;

pub fn data_layer(client: ApiClient, cache: QueryCache) -> JournalVoucherDataLayer {
    create_data_layer(client, cache, RESOURCE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoucherAction {
    Print,
    Approve,
    Release,
}

impl VoucherAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherAction::Print => "print",
            VoucherAction::Approve => "approve",
            VoucherAction::Release => "release",
        }
    }

    /// Statuses the action may be taken from. Reprinting is allowed.
    pub fn allowed_from(&self) -> &'static [JournalVoucherStatus] {
        match self {
            VoucherAction::Print => &[JournalVoucherStatus::Draft, JournalVoucherStatus::Printed],
            VoucherAction::Approve => &[JournalVoucherStatus::Printed],
            VoucherAction::Release => &[JournalVoucherStatus::Approved],
        }
    }

    pub fn is_allowed(&self, status: JournalVoucherStatus) -> bool {
        self.allowed_from().contains(&status)
    }
}

impl fmt::Display for VoucherAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `PUT /journal-voucher/{id}/{action}`. Refused locally when the
/// voucher's status does not allow the step.
pub async fn transition(
    layer: &JournalVoucherDataLayer,
    voucher: &JournalVoucher,
    action: VoucherAction,
    options: MutationOptions<JournalVoucher>,
) -> Result<JournalVoucher, ApiError> {
    let result: Result<JournalVoucher, ApiError> = async {
        if !action.is_allowed(voucher.status) {
            let mut errors = ValidationErrors::new();
            errors.add(
                "status",
                format!("Cannot {} a {} voucher", action, voucher.status.label().to_lowercase()),
            );
            return Err(ApiError::Validation(errors));
        }

        let path = layer.repository().path(&format!("{}/{}", voucher.id(), action));
        let updated: JournalVoucher = layer.repository().client().request(ApiRequest::put(path)).await?;
        layer.apply_change(&ResourceChange::Updated(updated.clone()));
        info!(id = %updated.id, %action, status = ?updated.status, "voucher moved");
        Ok::<_, ApiError>(updated)
    }
    .await;

    layer.settle(action.as_str(), result, &options)
}

pub async fn print(
    layer: &JournalVoucherDataLayer,
    voucher: &JournalVoucher,
    options: MutationOptions<JournalVoucher>,
) -> Result<JournalVoucher, ApiError> {
    transition(layer, voucher, VoucherAction::Print, options).await
}

pub async fn approve(
    layer: &JournalVoucherDataLayer,
    voucher: &JournalVoucher,
    options: MutationOptions<JournalVoucher>,
) -> Result<JournalVoucher, ApiError> {
    transition(layer, voucher, VoucherAction::Approve, options).await
}

pub async fn release(
    layer: &JournalVoucherDataLayer,
    voucher: &JournalVoucher,
    options: MutationOptions<JournalVoucher>,
) -> Result<JournalVoucher, ApiError> {
    transition(layer, voucher, VoucherAction::Release, options).await
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn {
    pub status: JournalVoucherStatus,
    pub label: &'static str,
    pub vouchers: Vec<JournalVoucher>,
}

impl BoardColumn {
    pub fn total_debit(&self) -> f64 {
        self.vouchers.iter().map(|v| v.total_debit).sum()
    }
}

/// One column per status in workflow order, newest voucher first.
/// Soft-deleted vouchers are left off the board.
pub fn approval_board(vouchers: &[JournalVoucher]) -> Vec<BoardColumn> {
    JournalVoucherStatus::ORDER
        .iter()
        .map(|status| {
            let mut column: Vec<JournalVoucher> = vouchers
                .iter()
                .filter(|v| v.status == *status && !v.audit.is_deleted())
                .cloned()
                .collect();
            column.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.voucher_number.cmp(&b.voucher_number)));
            BoardColumn {
                status: *status,
                label: status.label(),
                vouchers: column,
            }
        })
        .collect()
}
