//! Process supervision for vault-env
//!
//! [`ProcessSupervisor`] starts the target command with the resolved
//! secrets overlaid on the parent environment and hands back a
//! [`ChildProcessHandle`]. While the child runs, a [`SignalForwarder`]
//! relays termination signals received by the parent. Callers that replace
//! children over time use a [`SignalRelay`] to queue those signals instead.

pub mod signals;
pub mod supervisor;

pub use signals::{SignalForwarder, SignalRelay};
pub use supervisor::{
    ChildProcessHandle, ChildState, CommandSpec, ExitReport, ProcessSupervisor, SpawnOptions,
    StdioMode,
};
