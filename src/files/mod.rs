//! Queue-side file tool: command messages in, result messages out

pub mod command;
pub mod dispatcher;

pub use command::{Command, FileCommand, FileCommandResult, Mode};
pub use dispatcher::{dispatch, DispatchError, Outcome};
