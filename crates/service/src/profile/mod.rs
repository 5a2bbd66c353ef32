//! Role-tagged marketplace profiles, their completion score and search.

pub mod domain;
pub mod sanitize;
pub mod completion;
pub mod search;
pub mod service;

pub use search::SearchService;
pub use service::ProfileService;
