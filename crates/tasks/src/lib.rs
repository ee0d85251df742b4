//! Tracking and spawning of the process's long-running tasks.
//!
//! A critical task failing (error or panic) takes the whole process into
//! shutdown: the failure lands on the manager's channel, `monitor` signals
//! every [`ShutdownGuard`], and workers drain.

mod manager;
mod shutdown;

pub use manager::{TaskError, TaskExecutor, TaskManager};
pub use shutdown::{ShutdownGuard, ShutdownSignal};
