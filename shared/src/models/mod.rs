//! Domain models for the Amoura storefront

mod cart;
mod order;
mod product;
mod stats;
mod user;

pub use cart::*;
pub use order::*;
pub use product::*;
pub use stats::*;
pub use user::*;
