pub mod middleware;
mod router;
pub mod server;

pub use middleware::TracingConfig;
pub use server::HttpServer;
