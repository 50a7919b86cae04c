pub mod biz;
pub mod data;
pub mod error;
pub mod server;
pub mod service;

pub use error::ContactError;

pub type Result<T> = std::result::Result<T, ContactError>;
