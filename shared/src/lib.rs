//! Shared types and models for the Amoura storefront
//!
//! Domain models and the pure business rules (pricing, delivery timing,
//! order lifecycle, slugs, image checks) used by the backend and its tests.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
