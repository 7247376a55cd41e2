//! Agents and the registry that owns them
//!
//! Each agent is an addressable unit of conversation state with a private
//! mailbox. The registry owns every agent, routes messages between them and
//! maintains peer links.

pub mod agent;
pub mod mailbox;
pub mod registry;

pub use agent::{Agent, AgentStatus, Turn};
pub use mailbox::{Drained, Envelope, Mailbox};
pub use registry::{Addressee, AgentRegistry};
