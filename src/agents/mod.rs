//! Foundry agent service integration
//!
//! - `domain/` - resource types and the `AgentService` port
//! - `client` - REST implementation of the port
//! - `identity` - bearer token credentials
//! - `session` - per-prompt agent lifecycle
//! - `poller` / `reply` - run polling and reply extraction
//! - `probe` - red-team driver against an existing agent

pub mod client;
pub mod domain;
pub mod error;
pub mod identity;
pub mod poller;
pub mod probe;
pub mod reply;
pub mod session;
#[doc(hidden)]
pub mod testing;

pub use domain::*;
pub use error::*;
