//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscribed task (change worker) leaves its loop
//!
//! Signals (signals.rs):
//!     Ctrl+C / SIGTERM → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - One broadcast channel reaches every long-running task
//! - The file watcher is stopped by dropping it after the worker exits

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
