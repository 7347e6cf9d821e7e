//! Script generation and execution for the host's embedded environment.

pub mod builder;
pub mod chat;
pub mod context;
pub mod instruction;
pub mod literal;
pub mod result_channel;
pub mod session;

pub use builder::ScriptBuilder;
pub use context::ScriptContext;
pub use instruction::{CloseOption, ExtractOptions, Instruction, PurgeTarget};
pub use result_channel::{ResultChannel, ResultPayload};
pub use session::execute;
