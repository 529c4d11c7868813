//! External service integrations

pub mod email;
pub mod storage;

pub use email::EmailClient;
pub use storage::StorageClient;
