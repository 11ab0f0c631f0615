use serde::Serialize;

use crate::{ComputeResources, TaskId};

/// One schedulable unit of external work.
///
/// A `Task` is a template instance bound to concrete argument values:
/// its command is already fully rendered by the time it exists. It is
/// inert data from here on; execution, retries, and resource
/// arbitration belong to the engine.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub name: String,
    /// Name of the template this task was rendered from.
    pub template: String,
    /// Fully rendered command line.
    pub command: String,
    pub resources: ComputeResources,
    /// Retry ceiling consumed by the engine, not by us.
    pub max_attempts: u32,
    /// Tasks that must complete before this one may start.
    pub upstreams: Vec<TaskId>,
}
