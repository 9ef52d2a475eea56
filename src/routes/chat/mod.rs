pub mod get;
pub mod stream;

pub use get::*;
pub use stream::*;
