mod chat;
mod message;
mod session;
mod user;
mod user_request;

pub use chat::*;
pub use message::*;
pub use session::*;
pub use user::*;
pub use user_request::*;
