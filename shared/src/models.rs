use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything the server hands back with an opaque string identifier
pub trait Entity {
    fn id(&self) -> &str;
}

macro_rules! impl_entity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Entity for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
            }
        )+
    };
}

/// Audit trail stamped by the server on every record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by_id: Option<String>,
    #[serde(default)]
    pub updated_by_id: Option<String>,
    #[serde(default)]
    pub deleted_by_id: Option<String>,
}

impl Audit {
    /// Soft-deleted records keep their row and carry a deletion stamp
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Multi-tenant ownership of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub organization_id: String,
    pub branch_id: String,
}

/// Descriptor returned by the media upload endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub url: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(flatten)]
    pub scope: Scope,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub description: String,
    pub branch_type: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub region: String,
    #[serde(default)]
    pub barangay: String,
    pub postal_code: String,
    pub country_code: String,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(flatten)]
    pub audit: Audit,
}

/// A denomination of cash handled at the teller window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillsAndCoin {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub country_code: String,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(flatten)]
    pub scope: Scope,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAsset {
    pub id: String,
    pub member_profile_id: String,
    pub name: String,
    pub entry_date: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    pub cost: f64,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(flatten)]
    pub scope: Scope,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(flatten)]
    pub audit: Audit,
}

/// Where a ledger line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneralLedgerSource {
    Deposit,
    Withdraw,
    Payment,
    JournalVoucher,
    Adjustment,
    CheckVoucher,
    Loan,
}

/// One posted line of the general ledger. The server owns posting; the
/// client only reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralLedgerEntry {
    pub id: String,
    pub account_id: String,
    #[serde(default)]
    pub member_profile_id: Option<String>,
    #[serde(default)]
    pub transaction_batch_id: Option<String>,
    pub reference_number: String,
    pub source: GeneralLedgerSource,
    pub entry_date: DateTime<Utc>,
    pub debit: f64,
    pub credit: f64,
    pub balance: f64,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub scope: Scope,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalVoucherStatus {
    Draft,
    Printed,
    Approved,
    Released,
}

impl JournalVoucherStatus {
    /// Kanban column order on the approval board
    pub const ORDER: [JournalVoucherStatus; 4] = [
        JournalVoucherStatus::Draft,
        JournalVoucherStatus::Printed,
        JournalVoucherStatus::Approved,
        JournalVoucherStatus::Released,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            JournalVoucherStatus::Draft => "Draft",
            JournalVoucherStatus::Printed => "Printed",
            JournalVoucherStatus::Approved => "Approved",
            JournalVoucherStatus::Released => "Released",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalVoucherEntry {
    pub account_id: String,
    #[serde(default)]
    pub member_profile_id: Option<String>,
    #[serde(default)]
    pub description: String,
    pub debit: f64,
    pub credit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalVoucher {
    pub id: String,
    pub voucher_number: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub status: JournalVoucherStatus,
    pub total_debit: f64,
    pub total_credit: f64,
    #[serde(default)]
    pub entries: Vec<JournalVoucherEntry>,
    #[serde(flatten)]
    pub scope: Scope,
    #[serde(flatten)]
    pub audit: Audit,
}

impl_entity!(
    Media,
    Bank,
    Branch,
    BillsAndCoin,
    MemberAsset,
    Organization,
    GeneralLedgerEntry,
    JournalVoucher,
);
