//! Ids for use in typed collections.

use serde::Serialize;

/// Typed index of a task registered in a `Workflow`.
///
/// Ids are only handed out by `Workflow::add_task`, so holding one is
/// proof that the task it names was registered before any task that
/// lists it upstream.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(u32);

impl From<TaskId> for usize {
    fn from(id: TaskId) -> usize {
        id.0 as usize
    }
}

impl From<usize> for TaskId {
    fn from(val: usize) -> TaskId {
        Self(val as u32)
    }
}
