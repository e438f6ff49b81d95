pub mod coordinator;
pub mod engine;
pub mod pacing;
pub mod reconcile;

pub use coordinator::*;
pub use engine::*;
pub use pacing::*;
pub use reconcile::*;
