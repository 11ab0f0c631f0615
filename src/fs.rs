use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Log directory \"{0}\" is not a directory")]
    NotDirectory(String),
    #[error("Can't perform IO operation: \"{0}\" is not whitelisted")]
    NotWhitelisted(String),
    #[error("Filesystem path is not valid UTF-8")]
    PathEncoding,
}

/// All file operations in the crate should go through this struct.
///
/// All destructive operations check that the path in question is a child of
/// the single whitelisted prefix (this run's log directory), otherwise they
/// will not be performed. Everything the launcher writes lands there; the
/// estimation scripts' own outputs are the engine's business, not ours.
#[derive(Debug)]
pub struct Fs {
    /// The directory we are allowed to modify
    logs_prefix: PathBuf,
    /// if true, prevents all destructive operations
    dry_run: bool,
}

impl Fs {
    /// Create a new `Fs` rooted at the given log directory.
    pub fn new(logs_prefix: &Path, dry_run: bool) -> Self {
        Self {
            logs_prefix: logs_prefix.to_path_buf(),
            dry_run,
        }
    }

    /// Check whether the log directory exists, and create it if not.
    /// Also creates the `errors/` and `output/` subdirectories that task
    /// stderr/stdout get redirected into by the engine.
    pub fn ensure_logs_dir_exists(&mut self, verbose: bool) -> Result<()> {
        if !self.logs_prefix.exists() {
            if self.dry_run {
                eprintln!("Dry run. Not creating log directory {:?}", self.logs_prefix);
                return Ok(());
            }
            eprintln!(
                "Log directory {:?} doesn't exist. Creating.",
                self.logs_prefix
            );
            fs::create_dir_all(&self.logs_prefix).context("creating log directory")?;
        } else if !self.logs_prefix.is_dir() {
            return Err(Error::NotDirectory(
                self.logs_prefix
                    .to_str()
                    .ok_or(Error::PathEncoding)?
                    .to_owned(),
            )
            .into());
        } else if verbose {
            eprintln!(
                "Log directory {:?} already exists. Not creating.",
                self.logs_prefix
            );
        }

        self.logs_prefix = self.logs_prefix.canonicalize()?;

        if !self.dry_run {
            fs::create_dir_all(self.task_errors_dir()).context("creating errors directory")?;
            fs::create_dir_all(self.task_output_dir()).context("creating output directory")?;
        }
        Ok(())
    }

    /// Check if path exists on disk.
    pub fn exists<T: AsRef<Path>>(&self, path: T) -> bool {
        path.as_ref().exists()
    }

    /// Create a file, and return a writable `File` handle.
    pub fn create_file<T: AsRef<Path>>(&self, path: T) -> Result<fs::File> {
        let path = path.as_ref();
        self.check_whitelist(path)?;
        let f = fs::File::create(path).context("creating file")?;
        Ok(f)
    }

    /// Write entire str to a file.
    pub fn write_file<T: AsRef<Path>>(&self, path: T, text: &str) -> Result<()> {
        let path = path.as_ref();
        self.check_whitelist(path)?;
        fs::write(path, text).context("writing file")?;
        Ok(())
    }

    fn check_whitelist(&self, path: &Path) -> Result<()> {
        if self.dry_run || !path.starts_with(&self.logs_prefix) {
            Err(Error::NotWhitelisted(
                path.to_str().ok_or(Error::PathEncoding)?.to_owned(),
            )
            .into())
        } else {
            Ok(())
        }
    }
}

/// Common paths in the log directory.
impl Fs {
    /// $LOGS/metadata.json
    pub fn metadata_json(&self) -> PathBuf {
        self.logs_prefix.join("metadata.json")
    }

    /// $LOGS/stdout.txt (the engine's own stdout)
    pub fn engine_stdout(&self) -> PathBuf {
        self.logs_prefix.join("stdout.txt")
    }

    /// $LOGS/stderr.txt (the engine's own stderr)
    pub fn engine_stderr(&self) -> PathBuf {
        self.logs_prefix.join("stderr.txt")
    }

    /// $LOGS/errors (task stderr redirection target)
    pub fn task_errors_dir(&self) -> PathBuf {
        self.logs_prefix.join("errors")
    }

    /// $LOGS/output (task stdout redirection target)
    pub fn task_output_dir(&self) -> PathBuf {
        self.logs_prefix.join("output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_whitelist() -> Result<()> {
        let dir = tempdir()?;
        let mut fs = Fs::new(dir.path(), false);
        fs.ensure_logs_dir_exists(false)?;

        fs.write_file(fs.metadata_json(), "{}")?;
        assert!(fs.exists(fs.metadata_json()));

        let err = fs.write_file("/tmp/not-in-the-logs-dir", "x").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NotWhitelisted(..))
        ));
        Ok(())
    }

    #[test]
    fn test_dry_run_blocks_writes() -> Result<()> {
        let dir = tempdir()?;
        let fs = Fs::new(dir.path(), true);
        assert!(fs.write_file(fs.metadata_json(), "{}").is_err());
        Ok(())
    }
}
