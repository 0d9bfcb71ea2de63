//! Shared test utilities for servodoor integration tests.
//!
//! This module provides common test infrastructure including:
//! - A spawned controller wired to in-memory collaborators
//! - Candidate config file builders
//! - Time helpers for paused-clock tests

#![allow(dead_code)]

use servodoor::config::DeployFailurePolicy;
use servodoor::controller::{Command, ControllerHandle, ControllerSettings, SessionController};
use servodoor::device::{DoorState, MockConnector};
use servodoor::directory::{FixedPortDirectory, PortDescriptor};
use servodoor::pipeline::RecordingDeployer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const PRE_DEPLOY: Duration = Duration::from_millis(200);
pub const SETTLE: Duration = Duration::from_millis(5000);
pub const POLL: Duration = Duration::from_millis(5000);

/// A running controller plus handles on everything it talks to.
pub struct Harness {
    pub handle: ControllerHandle,
    pub connector: MockConnector,
    pub deployer: RecordingDeployer,
    pub directory: FixedPortDirectory,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn start(connector: MockConnector, policy: DeployFailurePolicy) -> Self {
        Self::start_with(connector, RecordingDeployer::new(), policy)
    }

    pub fn start_with(
        connector: MockConnector,
        deployer: RecordingDeployer,
        policy: DeployFailurePolicy,
    ) -> Self {
        let directory = FixedPortDirectory::new(vec![usb_port("COM5"), usb_port("COM6")]);
        let settings = ControllerSettings {
            poll_interval: POLL,
            pre_deploy_delay: PRE_DEPLOY,
            settle: SETTLE,
            on_failure: policy,
        };
        let controller = SessionController::new(
            Box::new(connector.clone()),
            Arc::new(deployer.clone()),
            Box::new(directory.clone()),
            settings,
        );

        Self {
            handle: controller.spawn(),
            connector,
            deployer,
            directory,
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub async fn send(&self, command: Command) {
        self.handle.send(command).await.expect("controller running");
        idle().await;
    }

    pub async fn open(&self, port: &str) {
        self.send(Command::OpenClose {
            port: port.to_string(),
        })
        .await;
    }

    /// Write a candidate config file into the harness directory.
    pub fn write_config(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write config");
        path
    }
}

/// Two doors, `east` open and `north` closed.
pub fn two_doors() -> MockConnector {
    MockConnector::with_doors(&[("north", DoorState::Close), ("east", DoorState::Open)])
}

pub fn usb_port(name: &str) -> PortDescriptor {
    PortDescriptor {
        name: name.to_string(),
        manufacturer: "MicroPython".to_string(),
        description: "Board in FS mode".to_string(),
        hwid: vec!["VID:PID=2E8A:0005".to_string(), "SER=E6614C31".to_string()],
    }
}

/// Let the controller drain everything queued.
///
/// With a paused clock this only returns once the runtime has nothing else
/// to do, so every command sent before it has been handled.
pub async fn idle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub async fn advance(by: Duration) {
    tokio::time::sleep(by).await;
}
