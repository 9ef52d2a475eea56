mod f_anonym;
mod f_bearer;
mod f_cookie;

pub use f_anonym::anonym;
pub use f_bearer::try_bearer;
pub use f_cookie::try_cookie;
