//! Per-request response glue.
//!
//! # Data Flow
//! ```text
//! response body writes
//!     → ResponseAdapter::writer
//!         → first matching config (ConfigManager snapshot)
//!         → ConfigManager::get_processor → processor writer
//!         → no match: the original output sink
//!     → ResponseAdapter::finished (or Drop) → Processor::finished
//! ```
//!
//! # Design Decisions
//! - The processor is resolved lazily, on first access to the writer
//! - An assembly failure is returned once; later calls fall back to the raw sink
//! - Dropping an unfinished adapter finishes the processor as failed

pub mod adapter;

pub use adapter::ResponseAdapter;
