use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use crate::exec::WorkflowStatus;

/// Send a workflow-completion email via the system `mail` command.
///
/// Best-effort: the caller logs and moves on if this fails.
pub fn send_completion_email(
    recipient: &str,
    job_name: &str,
    status: WorkflowStatus,
    logs_loc: &Path,
) -> Result<()> {
    let message = format!(
        "Workflow {job_name} has completed with status '{status}'.\n\n\
         Check out logs for more runtime info: {logs_loc:?}\n\n\
         This is an automated message from an unmonitored sender. \
         Do not reply to this email.\n"
    );

    let mut child = Command::new("mail")
        .arg("-s")
        .arg("Workflow Finished")
        .arg(recipient)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("spawning mail command")?;

    let mut stdin = child.stdin.take().context("attaching to mail stdin")?;
    stdin
        .write_all(message.as_bytes())
        .context("writing completion message")?;
    drop(stdin);

    let exit = child.wait().context("waiting for mail command")?;
    if !exit.success() {
        log::warn!("mail command exited with {exit}");
    }
    Ok(())
}
