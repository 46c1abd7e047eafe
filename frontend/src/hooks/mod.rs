pub mod query_cache;
pub mod reducer;
pub mod use_form;
pub mod use_realtime;
pub mod use_resource;
