//! Business logic services for the Amoura storefront

pub mod cart;
pub mod order;
pub mod product;
pub mod stats;
pub mod user;

pub use cart::CartService;
pub use order::OrderService;
pub use product::ProductService;
pub use stats::StatsService;
pub use user::UserService;
