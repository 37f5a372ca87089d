//! History lifecycle: the archival engine and its daily scheduler
//!
//! - **engine**: per-branch move of aged rows into archive mirrors, one
//!   transaction per branch, guarded by the `ARCHIVE_SCHEDULER` advisory lock
//! - **scheduler**: daily runner aligned to local midnight, plus the
//!   six-month reminder notification

pub mod engine;
pub mod scheduler;

pub use scheduler::Scheduler;
