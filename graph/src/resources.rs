use serde::Serialize;

/// Cluster resource request attached to a single task.
///
/// These fields are passed through to the engine untouched; nothing in
/// this crate interprets them beyond serialization.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ComputeResources {
    pub cores: u32,
    /// Memory request in GB.
    pub memory: u32,
    /// Per-task runtime ceiling in seconds.
    pub runtime: u32,
    pub queue: String,
    pub project: String,
    /// File the engine should redirect task stdout to.
    pub stdout: String,
    /// File the engine should redirect task stderr to.
    pub stderr: String,
    pub working_directory: String,
    /// How long the engine may hold the task before giving up on it.
    pub seconds_until_timeout: u32,
}
