mod memory;
mod mysql;

pub use memory::InMemoryRecordRepo;
pub use mysql::MySqlRecordRepo;
