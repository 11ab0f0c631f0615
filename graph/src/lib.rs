mod id;
pub use id::TaskId;

mod resources;
pub use resources::ComputeResources;

mod task;
pub use task::Task;

mod template;
pub use template::{TaskArgs, TaskTemplate};

mod workflow;
pub use workflow::Workflow;

pub type Hasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;
pub type HashMap<K, V> = std::collections::HashMap<K, V, Hasher>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Duplicate task name \"{0}\"")]
    DuplicateTaskName(String),
    #[error("Task \"{0}\" depends on task id {1}, which is not registered in the workflow")]
    UnknownUpstream(String, usize),
    #[error("Command for template \"{0}\" references undeclared placeholder \"{1}\"")]
    UndeclaredPlaceholder(String, String),
    #[error("Template \"{0}\" declares argument \"{1}\" that never appears in its command")]
    UnusedArg(String, String),
    #[error("Unclosed '{{' in command for template \"{0}\"")]
    UnclosedPlaceholder(String),
    #[error("Task \"{0}\" has no value for template argument \"{1}\"")]
    MissingArgValue(String, String),
    #[error("Task \"{0}\" sets \"{1}\", which template \"{2}\" does not declare")]
    UndeclaredArgValue(String, String, String),
}
