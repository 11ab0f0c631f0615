use std::fs::File;
use std::io::{stderr, stdout, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;

use graph::Workflow;

use crate::fs::Fs;

use super::Error;

/// How often we check whether the engine has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Terminal state of one workflow run, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Done,
    Failed,
    TimedOut,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
        }
    }

    pub fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `EngineDriver` is the call boundary to the external workflow engine.
///
/// It serializes the assembled graph to JSON, hands it to the engine
/// command on stdin, tees the engine's stdout and stderr into this
/// run's log files, and blocks until the engine exits or the bounded
/// wall-clock timeout passes. All scheduling, retry, and resource
/// arbitration happens on the other side of this boundary.
pub struct EngineDriver<'a> {
    /// Engine command; may carry leading flags like the R wrapper does.
    engine: &'a str,
    /// Filesystem interface
    fs: &'a Fs,
}

impl<'a> EngineDriver<'a> {
    /// Create a new `EngineDriver`.
    pub fn new(engine: &'a str, fs: &'a Fs) -> Self {
        Self { engine, fs }
    }

    /// Submit `wf` and block until the engine reports a terminal state.
    ///
    /// `resume` asks the engine to pick up from the last incomplete
    /// state of a matching previous run instead of re-running completed
    /// tasks.
    pub fn run(&self, wf: &Workflow, timeout: Duration, resume: bool) -> Result<WorkflowStatus> {
        let payload = serde_json::to_string(wf).context("while serializing workflow")?;

        let mut parts = self.engine.split_whitespace();
        let program = parts.next().unwrap_or(self.engine);
        let mut cmd = Command::new(program);
        cmd.args(parts);
        cmd.arg("run");
        cmd.arg("--timeout").arg(timeout.as_secs().to_string());
        if resume {
            cmd.arg("--resume");
        }
        cmd.arg("-");

        log::debug!("spawning engine: {:?} {:?}", cmd.get_program(), cmd.get_args());

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("while spawning workflow engine \"{program}\""))?;

        let child_out = child.stdout.take().ok_or(Error::StdioNotPiped)?;
        let child_err = child.stderr.take().ok_or(Error::StdioNotPiped)?;

        let out_file = self
            .fs
            .create_file(self.fs.engine_stdout())
            .context("creating engine stdout.txt file")?;
        let err_file = self
            .fs
            .create_file(self.fs.engine_stderr())
            .context("creating engine stderr.txt file")?;

        // start the tee threads before writing the payload, so a chatty
        // engine can't fill its stdout pipe while we're still writing:
        let thread_out = thread::spawn(move || communicate(child_out, out_file, stdout()));
        let thread_err = thread::spawn(move || communicate(child_err, err_file, stderr()));

        let mut stdin = child.stdin.take().ok_or(Error::StdioNotPiped)?;
        stdin
            .write_all(payload.as_bytes())
            .context("while writing workflow payload to engine stdin")?;
        // close stdin so the engine sees EOF:
        drop(stdin);

        let deadline = Instant::now() + timeout;
        let exit = loop {
            if let Some(exit) = child.try_wait().context("while waiting for the engine")? {
                break Some(exit);
            }
            if Instant::now() >= deadline {
                log::warn!(
                    "engine did not finish within {}s; killing it",
                    timeout.as_secs()
                );
                child.kill().context("while killing timed-out engine")?;
                child.wait().context("while reaping timed-out engine")?;
                break None;
            }
            thread::sleep(POLL_INTERVAL);
        };

        let engine_out = thread_out
            .join()
            .expect("Error joining stdout thread")
            .context("error communicating with engine stdout")?;
        thread_err
            .join()
            .expect("Error joining stderr thread")
            .context("error communicating with engine stderr")?;

        let Some(exit) = exit else {
            return Ok(WorkflowStatus::TimedOut);
        };

        let status = interpret(&engine_out, exit);
        match status {
            WorkflowStatus::Done => eprintln!("{} with {exit}.", "Engine finished".green()),
            _ => eprintln!("{} with {exit}.", "Engine finished".red()),
        }
        Ok(status)
    }
}

/// Map the engine's last status line (and its exit code, as a fallback)
/// to a terminal state.
fn interpret(engine_out: &str, exit: ExitStatus) -> WorkflowStatus {
    let last_line = engine_out
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty());

    match last_line {
        Some("D") | Some("done") => WorkflowStatus::Done,
        Some("E") | Some("error") | Some("failed") => WorkflowStatus::Failed,
        _ if exit.success() => WorkflowStatus::Done,
        _ => WorkflowStatus::Failed,
    }
}

/// Read `stream` to EOF, copying everything to `file` and `output`,
/// and also capture it for status interpretation.
fn communicate<R: Read, W: Write>(
    mut stream: R,
    mut file: File,
    mut output: W,
) -> std::io::Result<String> {
    let mut captured = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];
    loop {
        let num_read = stream.read(&mut buf)?;
        if num_read == 0 {
            break;
        }

        let buf = &buf[..num_read];
        file.write_all(buf)?;
        output.write_all(buf)?;
        captured.extend_from_slice(buf);
    }

    Ok(String::from_utf8_lossy(&captured).into_owned())
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn write_stub_engine(dir: &std::path::Path, body: &str) -> Result<String> {
        let path = dir.join("engine.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
        let mut perms = std::fs::metadata(&path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms)?;
        Ok(path.to_str().unwrap().to_owned())
    }

    fn logs_fs(dir: &std::path::Path) -> Result<Fs> {
        let mut fs = Fs::new(dir, false);
        fs.ensure_logs_dir_exists(false)?;
        Ok(fs)
    }

    #[test]
    fn test_done_status() -> Result<()> {
        let dir = tempdir()?;
        let engine = write_stub_engine(dir.path(), "cat - >/dev/null\necho D")?;
        let fs = logs_fs(dir.path())?;

        let wf = Workflow::create("wf", "slurm", "wf");
        let driver = EngineDriver::new(&engine, &fs);
        let status = driver.run(&wf, Duration::from_secs(30), true)?;

        assert_eq!(status, WorkflowStatus::Done);
        assert!(fs.exists(fs.engine_stdout()));
        Ok(())
    }

    #[test]
    fn test_failed_status() -> Result<()> {
        let dir = tempdir()?;
        let engine = write_stub_engine(dir.path(), "cat - >/dev/null\necho E\nexit 1")?;
        let fs = logs_fs(dir.path())?;

        let wf = Workflow::create("wf", "slurm", "wf");
        let driver = EngineDriver::new(&engine, &fs);
        let status = driver.run(&wf, Duration::from_secs(30), false)?;

        assert_eq!(status, WorkflowStatus::Failed);
        Ok(())
    }

    #[test]
    fn test_timeout() -> Result<()> {
        let dir = tempdir()?;
        let engine = write_stub_engine(dir.path(), "exec sleep 30")?;
        let fs = logs_fs(dir.path())?;

        let wf = Workflow::create("wf", "slurm", "wf");
        let driver = EngineDriver::new(&engine, &fs);
        let status = driver.run(&wf, Duration::from_millis(100), true)?;

        assert_eq!(status, WorkflowStatus::TimedOut);
        Ok(())
    }
}
