use anyhow::Result;

use crate::{ComputeResources, Error, HashMap, Hasher, Task, TaskId};

/// Values bound to a template's arguments when creating one task.
///
/// Everything is stringified on the way in, since the engine receives
/// a flat command line anyway.
#[derive(Debug, Default, Clone)]
pub struct TaskArgs {
    vals: HashMap<String, String>,
}

impl TaskArgs {
    pub fn new() -> Self {
        Self {
            vals: HashMap::with_capacity_and_hasher(16, Hasher::default()),
        }
    }

    /// Bind `key` to `val`, overwriting any previous binding.
    pub fn set<T: ToString>(&mut self, key: &str, val: T) -> &mut Self {
        self.vals.insert(key.to_owned(), val.to_string());
        self
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vals.get(key).map(String::as_str)
    }
}

/// A reusable, parameterized command pattern for one pipeline stage.
///
/// The command is a plain string with `{name}` slots. Each slot must be
/// declared in exactly one of three argument classes:
/// - node args vary the task's identity (e.g. location id, measure),
/// - task args carry per-run parameter values,
/// - op args are paths to tools and scripts.
///
/// The classes matter to the engine (it derives task identity from node
/// args); to us they are all just named slots, validated at
/// construction so a mismatch can never surface later than
/// template-build time.
#[derive(Debug, Clone)]
pub struct TaskTemplate {
    name: String,
    command_template: String,
    node_args: Vec<String>,
    task_args: Vec<String>,
    op_args: Vec<String>,
}

impl TaskTemplate {
    /// Create a new template, checking that the declared argument set
    /// and the set of `{placeholders}` in the command coincide.
    pub fn new(
        name: &str,
        command_template: &str,
        node_args: &[&str],
        task_args: &[&str],
        op_args: &[&str],
    ) -> Result<Self> {
        let template = Self {
            name: name.to_owned(),
            command_template: command_template.to_owned(),
            node_args: to_owned_vec(node_args),
            task_args: to_owned_vec(task_args),
            op_args: to_owned_vec(op_args),
        };

        let placeholders = template.placeholders()?;
        for slot in &placeholders {
            if !template.is_declared(slot) {
                return Err(
                    Error::UndeclaredPlaceholder(template.name.clone(), (*slot).to_owned()).into()
                );
            }
        }
        for arg in template.declared_args() {
            if !placeholders.iter().any(|p| *p == arg) {
                let (name, arg) = (template.name.clone(), arg.to_owned());
                return Err(Error::UnusedArg(name, arg).into());
            }
        }

        Ok(template)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Materialize one concrete task from this template.
    ///
    /// Every declared argument must have a value in `args`, and every
    /// value in `args` must be declared; both directions are errors,
    /// mirroring how the engine rejects mismatched task arguments at
    /// submission time.
    pub fn create_task(
        &self,
        name: &str,
        resources: ComputeResources,
        max_attempts: u32,
        upstreams: &[TaskId],
        args: &TaskArgs,
    ) -> Result<Task> {
        for key in args.vals.keys() {
            if !self.is_declared(key) {
                return Err(Error::UndeclaredArgValue(
                    name.to_owned(),
                    key.to_owned(),
                    self.name.clone(),
                )
                .into());
            }
        }

        let command = self.render(name, args)?;
        log::trace!("rendered task {name}: {command}");

        Ok(Task {
            name: name.to_owned(),
            template: self.name.clone(),
            command,
            resources,
            max_attempts,
            upstreams: upstreams.to_vec(),
        })
    }

    fn render(&self, task_name: &str, args: &TaskArgs) -> Result<String> {
        let mut out = String::with_capacity(self.command_template.len() * 2);
        let mut rest = self.command_template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after_open = &rest[open + 1..];
            let close = after_open
                .find('}')
                .ok_or_else(|| Error::UnclosedPlaceholder(self.name.clone()))?;
            let slot = &after_open[..close];
            let val = args
                .get(slot)
                .ok_or_else(|| {
                    Error::MissingArgValue(task_name.to_owned(), slot.to_owned())
                })?;
            out.push_str(val);
            rest = &after_open[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// All `{slot}` names appearing in the command, in order.
    fn placeholders(&self) -> Result<Vec<&str>> {
        let mut slots = Vec::with_capacity(16);
        let mut rest = self.command_template.as_str();
        while let Some(open) = rest.find('{') {
            let after_open = &rest[open + 1..];
            let close = after_open
                .find('}')
                .ok_or_else(|| Error::UnclosedPlaceholder(self.name.clone()))?;
            slots.push(&after_open[..close]);
            rest = &after_open[close + 1..];
        }
        Ok(slots)
    }

    fn is_declared(&self, arg: &str) -> bool {
        self.declared_args().any(|a| a == arg)
    }

    fn declared_args(&self) -> impl Iterator<Item = &str> {
        self.node_args
            .iter()
            .chain(&self.task_args)
            .chain(&self.op_args)
            .map(String::as_str)
    }
}

fn to_owned_vec(strs: &[&str]) -> Vec<String> {
    strs.iter().map(|s| (*s).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn template() -> Result<TaskTemplate> {
        TaskTemplate::new(
            "estimate",
            "{rscript} {script} {location_id} {version}",
            &["location_id"],
            &["version"],
            &["rscript", "script"],
        )
    }

    fn args() -> TaskArgs {
        let mut args = TaskArgs::new();
        args.set("rscript", "/usr/bin/Rscript")
            .set("script", "est.R")
            .set("location_id", 33)
            .set("version", "2022-03-29.01");
        args
    }

    #[test]
    fn test_render() -> Result<()> {
        let task = template()?.create_task(
            "estimate_33",
            ComputeResources::default(),
            3,
            &[],
            &args(),
        )?;
        assert_eq!(task.command, "/usr/bin/Rscript est.R 33 2022-03-29.01");
        assert_eq!(task.template, "estimate");
        Ok(())
    }

    #[test]
    fn test_undeclared_placeholder() {
        let err = TaskTemplate::new("t", "{rscript} {mystery}", &[], &[], &["rscript"])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UndeclaredPlaceholder(..))
        ));
    }

    #[test]
    fn test_unused_declared_arg() {
        let err = TaskTemplate::new("t", "{rscript}", &["extra"], &[], &["rscript"])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnusedArg(..))
        ));
    }

    #[test]
    fn test_unclosed_placeholder() {
        let err = TaskTemplate::new("t", "{rscript", &[], &[], &["rscript"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnclosedPlaceholder(..))
        ));
    }

    #[test]
    fn test_missing_value() -> Result<()> {
        let mut args = args();
        args.vals.remove("version");
        let err = template()?
            .create_task("estimate_33", ComputeResources::default(), 3, &[], &args)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingArgValue(..))
        ));
        Ok(())
    }

    #[test]
    fn test_undeclared_value() -> Result<()> {
        let mut args = args();
        args.set("surplus", 1);
        let err = template()?
            .create_task("estimate_33", ComputeResources::default(), 3, &[], &args)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UndeclaredArgValue(..))
        ));
        Ok(())
    }
}
