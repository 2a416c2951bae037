//! Search request construction

pub mod builder;

pub use builder::{full_search_request, search_request, QueryError, SearchRequest};
