//! Wire types shared by every part of the cooperative back-office client:
//! the records the REST API returns, the request payloads it accepts, the
//! pagination envelope, and the input schemas that mirror server-side
//! validation.

pub mod models;
pub mod pagination;
pub mod requests;
pub mod sanitize;
pub mod validation;

pub use models::*;
pub use pagination::{PageLink, PaginatedResult, PaginationQuery, DEFAULT_PAGE_SIZE};
pub use requests::*;
pub use validation::{FieldError, Schema, ValidationErrors, Validator};
