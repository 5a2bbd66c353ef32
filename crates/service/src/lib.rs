//! Service layer for the marketplace: budgets, milestones, payments, profiles.
//! - Separates business logic from data access (see `repo`).
//! - Reuses validation and entity definitions in `models` crate.
//! - Provides clear error types and documented interfaces.

pub mod actor;
pub mod errors;
pub mod pagination;
pub mod auth;
pub mod repo;
pub mod job;
pub mod budget;
pub mod notification;
pub mod profile;
pub mod storage;
pub mod runtime;
#[cfg(test)]
pub mod test_support;

pub use actor::Actor;
pub use errors::ServiceError;
