//! Host application invocation: single-flight locking, platform command
//! construction and subprocess execution.

pub mod command;
pub mod gate;
pub mod lock;
pub mod subprocess;

pub use command::{HeadlessRenderParams, HostPlatform};
pub use gate::{HostApplication, HostGate};
pub use lock::{HostLock, HostLockGuard};
