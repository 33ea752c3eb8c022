//! The polymorphic blocks of GraalSystems jobs and workflows.
//!
//! Each type here is a tagged union implementing [`Variant`](crate::variant::Variant),
//! so it can be built from configuration with [`resolve`](crate::variant::resolve)
//! and flattened back with [`read_back`](crate::variant::read_back).

mod library;
mod options;
mod schedule;
mod task;

pub use library::{CranLibrary, FileLibrary, GitLibrary, Library, MavenLibrary, PypiLibrary};
pub use options::{BashOptions, JobOptions, PythonOptions};
pub use schedule::{CronSchedule, OnceSchedule, Schedule};
pub use task::{resolve_tasks, validate_task_sequence, JobTask, Task};
