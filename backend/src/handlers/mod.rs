//! HTTP request handlers

pub mod cart;
pub mod docs;
pub mod health;
pub mod orders;
pub mod products;
pub mod stats;
pub mod users;

pub use cart::*;
pub use docs::*;
pub use health::*;
pub use orders::*;
pub use products::*;
pub use stats::*;
pub use users::*;
