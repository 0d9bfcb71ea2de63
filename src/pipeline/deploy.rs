//! Pushing a configuration file to a controller and hard-resetting it.
//!
//! The transfer itself is delegated to an external tool (`ampy` by default).
//! [`Deployer`] is the seam the controller calls through, so tests can swap
//! the subprocess for [`RecordingDeployer`].

use crate::config::DeployConfig;
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// A configuration file waiting to be pushed to the port it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub file: PathBuf,
    pub port: String,
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("could not run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} {step} failed ({status}): {stderr}")]
    Failed {
        tool: String,
        step: &'static str,
        status: String,
        stderr: String,
    },

    #[error("deploy worker stopped: {0}")]
    Worker(String),
}

/// Transfers a file to the device and hard-resets it.
///
/// Implementations block; the controller runs them on a blocking worker.
pub trait Deployer: Send + Sync {
    fn deploy(&self, file: &Path, port: &str) -> Result<(), DeployError>;
}

/// Deployer driving the `ampy` command line tool.
#[derive(Debug, Clone)]
pub struct AmpyDeployer {
    tool: String,
}

impl AmpyDeployer {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    pub fn from_config(config: &DeployConfig) -> Self {
        Self::new(config.tool.clone())
    }

    fn run(&self, step: &'static str, command: &mut Command) -> Result<(), DeployError> {
        debug!(tool = %self.tool, step, "running deploy step");
        let output: Output = command.output().map_err(|source| DeployError::Spawn {
            tool: self.tool.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(DeployError::Failed {
                tool: self.tool.clone(),
                step,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Deployer for AmpyDeployer {
    fn deploy(&self, file: &Path, port: &str) -> Result<(), DeployError> {
        info!(tool = %self.tool, port, file = %file.display(), "uploading configuration");
        self.run(
            "put",
            Command::new(&self.tool).args(["-p", port, "put"]).arg(file),
        )?;

        info!(tool = %self.tool, port, "hard-resetting controller");
        self.run(
            "reset",
            Command::new(&self.tool).args(["-p", port, "reset", "--hard"]),
        )
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<DeployRequest>,
    fail: bool,
    gated: bool,
    released: bool,
}

/// In-memory deployer that records every request.
///
/// A gated recorder blocks inside `deploy` until [`RecordingDeployer::release`]
/// is called, which lets tests act while a deploy is in flight.
#[derive(Debug, Clone, Default)]
pub struct RecordingDeployer {
    state: Arc<(Mutex<RecorderState>, Condvar)>,
}

impl RecordingDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        let deployer = Self::new();
        deployer.state.0.lock().gated = true;
        deployer
    }

    pub fn fail(&self, fail: bool) {
        self.state.0.lock().fail = fail;
    }

    /// Let a blocked (or future) `deploy` call return.
    pub fn release(&self) {
        let (lock, cvar) = &*self.state;
        lock.lock().released = true;
        cvar.notify_all();
    }

    pub fn calls(&self) -> Vec<DeployRequest> {
        self.state.0.lock().calls.clone()
    }
}

impl Deployer for RecordingDeployer {
    fn deploy(&self, file: &Path, port: &str) -> Result<(), DeployError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        state.calls.push(DeployRequest {
            file: file.to_path_buf(),
            port: port.to_string(),
        });
        while state.gated && !state.released {
            cvar.wait(&mut state);
        }

        if state.fail {
            return Err(DeployError::Failed {
                tool: "recorder".to_string(),
                step: "put",
                status: "exit status: 1".to_string(),
                stderr: "could not enter raw repl".to_string(),
            });
        }
        Ok(())
    }
}
