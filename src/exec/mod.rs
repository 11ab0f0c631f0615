/// Submitting the assembled graph to the external engine
mod driver;
pub use driver::{EngineDriver, WorkflowStatus};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Engine stdio is not piped (should not happen)")]
    StdioNotPiped,
    #[error("Workflow finished with terminal status '{0}'")]
    WorkflowFailed(WorkflowStatus),
}
