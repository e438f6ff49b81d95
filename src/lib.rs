pub mod handlers;
pub mod models;
pub mod clients;
pub mod mapping;
pub mod sync;
pub mod config;

// Convenient re-exports for tests and external callers
pub use handlers::*;
pub use models::*;
pub use clients::*;
pub use mapping::*;
pub use sync::*;
pub use config::*;
