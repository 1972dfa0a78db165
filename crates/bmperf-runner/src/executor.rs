//! Benchmark-runner process launching.
//!
//! Output of every launched process (stdout and stderr together) is written
//! to `<workdir>/<title>.log`, which the orchestrator parses once the
//! process has exited.

use std::fs::File;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use crate::error::ExecError;

/// Launches commands in one working directory with an environment overlay.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    workdir: PathBuf,
    env: Vec<(String, String)>,
}

impl ProcessExecutor {
    /// `env` entries are `KEY=VALUE`; entries without `=` are ignored with a
    /// warning.
    pub fn new(workdir: impl Into<PathBuf>, env: &[String]) -> Self {
        let env = env
            .iter()
            .filter_map(|entry| match entry.split_once('=') {
                Some((k, v)) if !k.is_empty() => Some((k.to_string(), v.to_string())),
                _ => {
                    warn!(entry = %entry, "ignoring malformed environment entry");
                    None
                }
            })
            .collect();
        Self {
            workdir: workdir.into(),
            env,
        }
    }

    fn log_path(&self, title: &str) -> PathBuf {
        self.workdir.join(format!("{title}.log"))
    }

    /// Launch `argv` without waiting for it.
    pub fn fire(&self, title: &str, argv: &[String]) -> Result<RunningProcess, ExecError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ExecError::EmptyCommand(title.to_string()))?;

        std::fs::create_dir_all(&self.workdir).map_err(|source| ExecError::Io {
            path: self.workdir.clone(),
            source,
        })?;
        let log = self.log_path(title);
        let io_error = |source| ExecError::Io {
            path: log.clone(),
            source,
        };
        let stdout = File::create(&log).map_err(io_error)?;
        let stderr = stdout.try_clone().map_err(io_error)?;

        debug!(
            title,
            command = %argv.join(" "),
            workdir = %self.workdir.display(),
            "launching"
        );
        let child = Command::new(program)
            .args(args)
            .current_dir(&self.workdir)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?;

        Ok(RunningProcess {
            title: title.to_string(),
            child,
            log,
        })
    }
}

/// A launched process whose output goes to its log file.
#[derive(Debug)]
pub struct RunningProcess {
    title: String,
    child: Child,
    log: PathBuf,
}

impl RunningProcess {
    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Wait for exit and return the log path.
    ///
    /// # Errors
    ///
    /// [`ExecError::Failed`] on a non-zero exit status.
    pub fn drain(mut self) -> Result<PathBuf, ExecError> {
        let status = self
            .child
            .wait()
            .map_err(|source| ExecError::Wait {
                title: self.title.clone(),
                source,
            })?;
        debug!(title = %self.title, %status, "process exited");
        if status.success() {
            Ok(self.log)
        } else {
            Err(ExecError::Failed {
                title: self.title,
                status,
            })
        }
    }
}
