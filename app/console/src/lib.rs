pub mod api;
pub mod app;
pub mod prompt;
pub mod store;
pub mod view;

pub use api::{ClientError, HttpRecordApi, RecordApi};
pub use app::ConsoleApp;
pub use store::ContactStore;
