pub mod feed;
pub mod source;
pub mod category;

pub use feed::*;
pub use source::*;
pub use category::*;
