//! # Cooperative back-office client
//!
//! Typed access to the back-office REST API for screens and tools.
//!
//! ## Layers:
//! - `services` - configuration, logging, the HTTP transport and the generic CRUD repository
//! - `hooks` - query cache, cache-aware data layer, realtime sync and form binding
//! - `state` - signed-in user, organization and branch, confirmation prompts
//! - `modules` - one module per resource
//! - `bootstrap` - builds a `ClientContext` from configuration

pub mod bootstrap;
pub mod hooks;
pub mod modules;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

pub use bootstrap::{initialize_client, initialize_client_from_env, ClientContext};
pub use hooks::query_cache::{CacheKey, QueryCache};
pub use hooks::reducer::{reduce, QueryData, ResourceChange};
pub use hooks::use_form::{FocusTarget, FormController, FormMode, SubmitOutcome};
pub use hooks::use_realtime::{EventAction, EventBus, RealtimeMessage, RealtimeSync, Topic};
pub use hooks::use_resource::{create_data_layer, DataLayer, MutationOptions, QueryOptions};
pub use services::api::{ApiClient, ApiRequest, HttpTransport, MediaUpload, ReqwestTransport};
pub use services::config::ClientConfig;
pub use services::error::ApiError;
pub use state::{Action, AppState, AppStore};
