//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, login and bearer-token handling for marketplace accounts.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod token;

pub use service::AuthService;
