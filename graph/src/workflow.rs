use anyhow::Result;
use serde::Serialize;

use crate::{Error, HashMap, Hasher, Task, TaskId};

/// The complete DAG of tasks for one pipeline run.
///
/// Tasks are registered in dependency order: `add_task` hands out the
/// `TaskId`s that later tasks use in their upstream lists, and rejects
/// any upstream id it has not issued yet. That makes the graph acyclic
/// by construction; there is no separate cycle check.
#[derive(Debug, Serialize)]
pub struct Workflow {
    name: String,
    default_cluster: String,
    workflow_args: String,
    tasks: Vec<Task>,
    #[serde(skip)]
    by_name: HashMap<String, TaskId>,
}

impl Workflow {
    /// Create a new, empty `Workflow`.
    pub fn create(name: &str, default_cluster: &str, workflow_args: &str) -> Self {
        Self {
            name: name.to_owned(),
            default_cluster: default_cluster.to_owned(),
            workflow_args: workflow_args.to_owned(),
            tasks: Vec::with_capacity(64),
            by_name: HashMap::with_capacity_and_hasher(64, Hasher::default()),
        }
    }

    /// Register a task, returning the id that downstream tasks use to
    /// declare their dependency on it.
    pub fn add_task(&mut self, task: Task) -> Result<TaskId> {
        if self.by_name.contains_key(&task.name) {
            return Err(Error::DuplicateTaskName(task.name).into());
        }
        for upstream in &task.upstreams {
            let idx: usize = (*upstream).into();
            if idx >= self.tasks.len() {
                return Err(Error::UnknownUpstream(task.name, idx).into());
            }
        }

        let id = TaskId::from(self.tasks.len());
        self.by_name.insert(task.name.clone(), id);
        self.tasks.push(task);
        Ok(id)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of registered tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Get the task with the given id.
    #[inline]
    pub fn get(&self, id: TaskId) -> &Task {
        &self.tasks[usize::from(id)]
    }

    /// Look up a task id by name.
    pub fn task_id(&self, name: &str) -> Option<TaskId> {
        self.by_name.get(name).copied()
    }

    /// Iterate over all registered tasks in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Names of the given task's upstream dependencies.
    pub fn upstream_names(&self, id: TaskId) -> Vec<&str> {
        self.get(id)
            .upstreams
            .iter()
            .map(|up| self.get(*up).name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComputeResources;

    fn task(name: &str, upstreams: &[TaskId]) -> Task {
        Task {
            name: name.to_owned(),
            template: "t".to_owned(),
            command: format!("run {name}"),
            resources: ComputeResources::default(),
            max_attempts: 1,
            upstreams: upstreams.to_vec(),
        }
    }

    #[test]
    fn test_register_and_lookup() -> Result<()> {
        let mut wf = Workflow::create("wf", "slurm", "wf");
        let a = wf.add_task(task("a", &[]))?;
        let b = wf.add_task(task("b", &[a]))?;

        assert_eq!(wf.len(), 2);
        assert_eq!(wf.task_id("a"), Some(a));
        assert_eq!(wf.task_id("c"), None);
        assert_eq!(wf.upstream_names(b), vec!["a"]);
        assert!(wf.get(a).upstreams.is_empty());
        Ok(())
    }

    #[test]
    fn test_duplicate_name_rejected() -> Result<()> {
        let mut wf = Workflow::create("wf", "slurm", "wf");
        wf.add_task(task("a", &[]))?;
        let err = wf.add_task(task("a", &[])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::DuplicateTaskName(..))
        ));
        assert_eq!(wf.len(), 1);
        Ok(())
    }

    #[test]
    fn test_unknown_upstream_rejected() -> Result<()> {
        let mut wf = Workflow::create("wf", "slurm", "wf");
        wf.add_task(task("a", &[]))?;
        let stale = TaskId::from(7usize);
        let err = wf.add_task(task("b", &[stale])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnknownUpstream(..))
        ));
        Ok(())
    }
}
