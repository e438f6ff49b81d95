pub mod translator;
pub mod destination;

pub use translator::*;
pub use destination::*;
