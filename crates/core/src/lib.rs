//! Automation engine for the compositing host application.
//!
//! Compiles jobs into scripts for the host's embedded environment, gates
//! every host invocation behind a single process-wide lock, and recovers
//! results and failures from files and process output.

pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod host;
pub mod scripting;
pub mod types;

pub use error::{EngineError, ErrorKind};
