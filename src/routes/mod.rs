pub mod chat;
pub mod health_checks;

pub use health_checks::*;
