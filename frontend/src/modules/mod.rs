//! One module per back-office resource. Each names its REST path, builds
//! its `DataLayer`, and adds whatever the resource needs beyond plain CRUD.

pub mod bank;
pub mod bills_and_coins;
pub mod branch;
pub mod general_ledger;
pub mod journal_voucher;
pub mod member_asset;
pub mod organization;
