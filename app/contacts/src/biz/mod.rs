mod models;
mod record_usecase;

pub use models::{NewRecord, NotFoundPolicy, Record};
pub use record_usecase::{RecordRepo, RecordUseCase};
