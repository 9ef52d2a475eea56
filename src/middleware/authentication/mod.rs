mod getheader;
mod manager;
mod manager_middleware;
mod method;
mod session_cache;

pub use getheader::*;
pub use manager::*;
pub use manager_middleware::*;
pub use session_cache::SessionCache;
