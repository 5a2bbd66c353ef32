//! SeaORM entities for the marketplace plus the domain enums stored in their
//! string columns (roles, statuses, budget types) and low-level validators.

pub mod errors;
pub mod db;
pub mod tenant;
pub mod user;
pub mod user_credentials;
pub mod job;
pub mod budget;
pub mod milestone;
pub mod payment;
pub mod exchange_rate;
pub mod profile;
