pub mod agent;
pub mod chat;
pub mod quota;

pub use agent::{Agent, AgentError, AgentOutcome};
pub use quota::QuotaStatus;
