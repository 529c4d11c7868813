//! Request extractors and guards

pub mod auth;

pub use auth::{AdminUser, CurrentUser, CustomerUser, OptionalUser};
