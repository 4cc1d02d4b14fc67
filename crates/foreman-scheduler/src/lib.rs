//! `foreman-scheduler` — tasks, jobs, and the scheduling loop.
//!
//! # Overview
//!
//! [`Scheduler::load`] resolves a [`Document`](foreman_core::Document) into
//! a sorted task list: extensions populate the slave registry, every job
//! resolves its slave and converts its arguments eagerly, and any failure is
//! fatal before the loop ever starts. [`Scheduler::run`] then waits for the
//! earliest `next_execution`, executes every due task in priority order, and
//! replans — indefinitely, surviving every worker failure along the way.
//!
//! # Failure isolation
//!
//! | Failure                     | Effect                                     |
//! |-----------------------------|--------------------------------------------|
//! | Anything during load        | Fatal `SetupError`, process never starts   |
//! | A slave's logic erroring    | Captured on the job's `Context`            |
//! | Notification delivery       | Logged by the manager, never propagated    |

pub mod engine;
pub mod job;
pub mod report;
pub mod task;

pub use engine::Scheduler;
pub use job::Job;
pub use report::Report;
pub use task::Task;
