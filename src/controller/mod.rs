//! Session controller: the single owner of lifecycle state.
//!
//! The controller runs as one task. Commands arrive over an `mpsc` channel,
//! deploy steps report back over an internal channel, and each reaction ends
//! by publishing the [`DisplayState`] on a `watch` channel. Reactions never
//! overlap, so the session is only ever touched from one place.
//!
//! # Deploy sequence
//!
//! ```text
//! LoadConfig ─> validate ─> Announced ──(pre-deploy delay)──> disconnect
//!            ─> AwaitingDeploy ──(blocking worker)──> AwaitingSettle
//!            ──(settle delay)──> reconnect + reload ─> Idle
//! ```
//!
//! While a deploy is in flight, `OpenClose`, `ToggleDoor` and `LoadConfig`
//! are rejected and port polling is suspended.

mod command;
mod display;

pub use command::Command;
pub use display::{DisplayState, OpenCloseLabel};

use crate::config::{Config, DeployFailurePolicy};
use crate::device::{DeviceConnector, DeviceSession, DoorState, DoorStates};
use crate::directory::{PortDescriptor, PortProvider};
use crate::pipeline::{self, ConfigRead, DeployError, DeployRequest, Deployer};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Status shown while a deploy is in flight.
pub const DEPLOY_ANNOUNCEMENT: &str = "uploading config and resetting device - please wait";

/// Status while a cancelled deploy waits for the deploy tool to exit.
pub const CANCEL_PENDING: &str = "cancelling: waiting for the deploy tool to finish";

const COMMAND_QUEUE: usize = 64;

/// Timing and failure handling of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub pre_deploy_delay: Duration,
    /// Wait after a hard reset before reconnecting.
    pub settle: Duration,
    pub on_failure: DeployFailurePolicy,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.serial.poll_interval(),
            pre_deploy_delay: config.deploy.pre_deploy_delay(),
            settle: config.deploy.settle(),
            on_failure: config.deploy.on_failure,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Step of an in-flight deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    /// Status announced, waiting out the pre-deploy delay. Session still open.
    Announced,
    /// Session closed, deploy tool running.
    AwaitingDeploy,
    /// Waiting for the controller to reboot.
    AwaitingSettle,
}

#[derive(Debug)]
struct Deploy {
    id: u64,
    request: DeployRequest,
    stage: DeployStage,
    timer: Option<JoinHandle<()>>,
    failure: Option<String>,
    /// Cancel arrived while the deploy tool was running; stop once it exits.
    cancelled: bool,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Deploying(Deploy),
}

#[derive(Debug)]
enum StepEvent {
    PreDeployElapsed { id: u64 },
    DeployFinished { id: u64, result: Result<(), DeployError> },
    SettleElapsed { id: u64 },
}

impl StepEvent {
    fn id(&self) -> u64 {
        match self {
            Self::PreDeployElapsed { id }
            | Self::DeployFinished { id, .. }
            | Self::SettleElapsed { id } => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("session controller has stopped")]
    Stopped,

    #[error("session controller command queue is full")]
    QueueFull,

    #[error("session controller task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Owns the device session and drives it from commands.
pub struct SessionController {
    connector: Box<dyn DeviceConnector>,
    deployer: Arc<dyn Deployer>,
    directory: Box<dyn PortProvider>,
    settings: ControllerSettings,
    session: DeviceSession,
    /// Snapshot from the last poll.
    ports: Vec<PortDescriptor>,
    phase: Phase,
    next_deploy_id: u64,
    display: DisplayState,
    display_tx: watch::Sender<DisplayState>,
    steps_tx: mpsc::UnboundedSender<StepEvent>,
    steps_rx: Option<mpsc::UnboundedReceiver<StepEvent>>,
}

impl SessionController {
    pub fn new(
        connector: Box<dyn DeviceConnector>,
        deployer: Arc<dyn Deployer>,
        directory: Box<dyn PortProvider>,
        settings: ControllerSettings,
    ) -> Self {
        let display = DisplayState::default();
        let (display_tx, _) = watch::channel(display.clone());
        let (steps_tx, steps_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            deployer,
            directory,
            settings,
            session: DeviceSession::new(),
            ports: Vec::new(),
            phase: Phase::Idle,
            next_deploy_id: 0,
            display,
            display_tx,
            steps_tx,
            steps_rx: Some(steps_rx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display_tx.subscribe()
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Stage of the in-flight deploy, `None` when idle.
    pub fn deploy_stage(&self) -> Option<DeployStage> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Deploying(deploy) => Some(deploy.stage),
        }
    }

    /// Move the controller onto its own task.
    pub fn spawn(self) -> ControllerHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        let display = self.subscribe();
        let task = tokio::spawn(self.run(commands_rx));
        ControllerHandle {
            commands: commands_tx,
            display,
            task,
        }
    }

    /// React to commands, deploy steps and poll ticks until shut down.
    ///
    /// Dropping every command sender counts as a shutdown.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let Some(mut steps) = self.steps_rx.take() else {
            error!("session controller can only run once");
            return;
        };

        let mut poll = tokio::time::interval(self.settings.poll_interval.max(Duration::from_millis(1)));
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(poll_ms = self.settings.poll_interval.as_millis() as u64, "session controller started");

        loop {
            let flow = tokio::select! {
                command = commands.recv() => self.handle(command.unwrap_or(Command::Shutdown)),
                Some(event) = steps.recv() => {
                    self.on_step(event);
                    Flow::Continue
                }
                _ = poll.tick() => self.handle(Command::Tick),
            };
            if flow == Flow::Stop {
                break;
            }
        }
        info!("session controller stopped");
    }

    fn handle(&mut self, command: Command) -> Flow {
        debug!(?command, "command received");

        if command.mutates_session() {
            if let Some(stage) = self.deploy_stage() {
                warn!(?command, ?stage, "command rejected during deploy");
                self.display.status = "busy: deploy in progress".to_string();
                self.publish();
                return Flow::Continue;
            }
        }

        let flow = match command {
            Command::OpenClose { port } => {
                self.open_close(&port);
                Flow::Continue
            }
            Command::ToggleDoor { index, name, open } => {
                self.toggle_door(index, &name, open);
                Flow::Continue
            }
            Command::LoadConfig { path } => {
                self.load_config(&path);
                Flow::Continue
            }
            Command::Tick => {
                self.tick();
                Flow::Continue
            }
            Command::DismissError => {
                self.display.dismiss_error();
                Flow::Continue
            }
            Command::Cancel => {
                self.cancel();
                Flow::Continue
            }
            Command::Shutdown => {
                self.shutdown();
                Flow::Stop
            }
        };
        self.publish();
        flow
    }

    fn publish(&self) {
        let display = &self.display;
        self.display_tx.send_if_modified(|current| {
            if current == display {
                return false;
            }
            *current = display.clone();
            true
        });
    }

    fn tick(&mut self) {
        if self.session.is_connected() || self.deploy_stage().is_some() {
            debug!("port poll skipped");
            return;
        }
        self.poll_ports();
    }

    fn poll_ports(&mut self) {
        self.ports = self.directory.list_ports();
        self.display.set_ports(&self.ports);
    }

    fn open_close(&mut self, port: &str) {
        if self.session.is_connected() {
            self.close_session();
        } else {
            self.open_session(port);
        }
    }

    /// Connect and populate the display. Returns whether a session is open.
    fn open_session(&mut self, port: &str) -> bool {
        if port.is_empty() {
            self.display.show_error("no port selected");
            return false;
        }

        if let Err(e) = self.session.connect(self.connector.as_ref(), port) {
            error!(port, error = %e, "could not open session");
            self.display.show_error(format!("could not open {port}: {e}"));
            return false;
        }

        self.populate(port);
        true
    }

    /// Fill the display from a freshly opened session.
    fn populate(&mut self, port: &str) {
        let descriptor = self
            .ports
            .iter()
            .find(|p| p.name == port)
            .cloned()
            .unwrap_or_else(|| PortDescriptor::bare(port));

        self.display.open_close = OpenCloseLabel::Close;
        self.display.load_enabled = true;
        self.display.connected_port = Some(port.to_string());
        self.display.port_info = descriptor.info_text();

        match pipeline::read_device_config(&mut self.session) {
            ConfigRead::Loaded(config) => {
                self.display.config_info = match serde_json::to_string_pretty(&config) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "could not render configuration");
                        format!("{config:?}")
                    }
                };

                let names = pipeline::door_names(&config);
                let checks = match self.session.get_doors() {
                    Ok(states) => names
                        .iter()
                        .map(|name| states.get(name).is_some_and(|s| s.is_open()))
                        .collect(),
                    Err(e) => {
                        warn!(port, error = %e, "get_doors failed; showing all doors closed");
                        vec![false; names.len()]
                    }
                };
                info!(port, doors = names.len(), "configuration loaded");
                self.display.set_doors(names, checks);
            }
            read => {
                let text = read.status_text().unwrap_or_default();
                warn!(port, status = %text, "configuration not loaded");
                self.display.config_info = text;
                self.display.set_doors(Vec::new(), Vec::new());
            }
        }
    }

    fn close_session(&mut self) {
        if let Some(port) = self.session.disconnect() {
            self.display.status = format!("closed {port}");
        }
        self.display.clear_session();
        self.poll_ports();
    }

    fn toggle_door(&mut self, index: usize, name: &str, open: bool) {
        if !self.session.is_connected() {
            debug!(door = name, "toggle ignored without a session");
            return;
        }

        let Some(position) = self.display.door_names.iter().position(|n| n == name) else {
            warn!(door = name, index, "toggle for a door not in the current configuration");
            self.display.status = format!("door {name} is not in the current configuration");
            return;
        };
        if position != index {
            debug!(door = name, index, position, "stale door index, acting on name");
        }

        let state = DoorState::from_open(open);
        let mut doors = DoorStates::new();
        doors.insert(name.to_string(), state);

        match self.session.set_doors(&doors) {
            Ok(()) => {
                if let Some(check) = self.display.door_checks.get_mut(position) {
                    *check = open;
                }
                self.display.status = format!("{name}: {state}");
            }
            Err(e) => {
                warn!(door = name, error = %e, "set_doors failed");
                self.display.status = format!("set_doors failed for {name}: {e}");
            }
        }
    }

    fn load_config(&mut self, raw_path: &str) {
        let Some(port) = self.session.port_name().map(str::to_string) else {
            info!("load requested without a session");
            self.display.status = "no device connected; nothing to load".to_string();
            return;
        };

        let file = pipeline::strip_file_uri(raw_path);
        if let Err(e) = pipeline::validate_config_file(&file) {
            warn!(file = %file.display(), error = %e, "candidate configuration rejected");
            self.display.show_error(e.to_string());
            return;
        }

        let id = self.next_deploy_id;
        self.next_deploy_id += 1;
        info!(deploy = id, file = %file.display(), port = %port, "deploy announced");

        self.display.status = DEPLOY_ANNOUNCEMENT.to_string();
        self.display.busy = true;
        self.display.load_enabled = false;

        let timer = self.schedule(self.settings.pre_deploy_delay, StepEvent::PreDeployElapsed { id });
        self.phase = Phase::Deploying(Deploy {
            id,
            request: DeployRequest { file, port },
            stage: DeployStage::Announced,
            timer: Some(timer),
            failure: None,
            cancelled: false,
        });
    }

    fn schedule(&self, delay: Duration, event: StepEvent) -> JoinHandle<()> {
        let steps = self.steps_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = steps.send(event);
        })
    }

    fn on_step(&mut self, event: StepEvent) {
        let stage = match &self.phase {
            Phase::Deploying(deploy) if deploy.id == event.id() => deploy.stage,
            _ => {
                debug!(?event, "stale deploy step ignored");
                return;
            }
        };

        match (stage, event) {
            (DeployStage::Announced, StepEvent::PreDeployElapsed { .. }) => self.start_deploy(),
            (DeployStage::AwaitingDeploy, StepEvent::DeployFinished { result, .. }) => {
                self.deploy_finished(result)
            }
            (DeployStage::AwaitingSettle, StepEvent::SettleElapsed { .. }) => self.reconnect(),
            (stage, event) => debug!(?stage, ?event, "out-of-order deploy step ignored"),
        }
        self.publish();
    }

    fn start_deploy(&mut self) {
        let Phase::Deploying(deploy) = &mut self.phase else {
            return;
        };
        deploy.stage = DeployStage::AwaitingDeploy;
        deploy.timer = None;
        let id = deploy.id;
        let DeployRequest { file, port } = deploy.request.clone();

        self.session.disconnect();
        self.display.clear_session();
        info!(deploy = id, port = %port, file = %file.display(), "deploying configuration");

        let deployer = Arc::clone(&self.deployer);
        let steps = self.steps_tx.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || deployer.deploy(&file, &port))
                .await
                .unwrap_or_else(|e| Err(DeployError::Worker(e.to_string())));
            let _ = steps.send(StepEvent::DeployFinished { id, result });
        });
    }

    fn deploy_finished(&mut self, result: Result<(), DeployError>) {
        if matches!(&self.phase, Phase::Deploying(deploy) if deploy.cancelled) {
            self.finish_cancelled(result);
            return;
        }

        if let Err(e) = &result {
            if self.settings.on_failure == DeployFailurePolicy::Abort {
                error!(error = %e, "deploy failed; reconnect skipped");
                self.phase = Phase::Idle;
                self.display.busy = false;
                self.display.status = "deploy failed".to_string();
                self.display
                    .show_error(format!("deploy failed, device left disconnected: {e}"));
                self.poll_ports();
                return;
            }
            warn!(error = %e, "deploy failed; reconnecting anyway");
            self.display.status = format!("deploy failed ({e}); reconnecting anyway");
        } else {
            info!("deploy finished; waiting for controller to reboot");
        }

        let timer = match &self.phase {
            Phase::Deploying(deploy) => {
                self.schedule(self.settings.settle, StepEvent::SettleElapsed { id: deploy.id })
            }
            Phase::Idle => return,
        };
        if let Phase::Deploying(deploy) = &mut self.phase {
            deploy.stage = DeployStage::AwaitingSettle;
            deploy.timer = Some(timer);
            deploy.failure = result.err().map(|e| e.to_string());
        }
    }

    fn reconnect(&mut self) {
        let Phase::Deploying(deploy) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return;
        };
        self.display.busy = false;

        let port = deploy.request.port;
        info!(deploy = deploy.id, port = %port, "reconnecting after reset");
        if !self.open_session(&port) {
            if let Some(failure) = &deploy.failure {
                let reconnect_error = std::mem::take(&mut self.display.error_message);
                self.display
                    .show_error(format!("deploy failed ({failure}); {reconnect_error}"));
            }
            self.poll_ports();
            return;
        }

        self.display.status = match deploy.failure {
            None => format!("configuration deployed to {port}"),
            Some(failure) => format!("reconnected to {port} after failed deploy: {failure}"),
        };
    }

    fn cancel(&mut self) {
        if let Phase::Deploying(deploy) = &mut self.phase {
            if deploy.stage == DeployStage::AwaitingDeploy {
                // The tool still owns the port; stay busy until it exits.
                if !deploy.cancelled {
                    info!(deploy = deploy.id, "cancel requested while deploy tool runs");
                    deploy.cancelled = true;
                }
                self.display.status = CANCEL_PENDING.to_string();
                return;
            }
        }

        let Phase::Deploying(deploy) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            self.display.status = "nothing to cancel".to_string();
            return;
        };
        if let Some(timer) = &deploy.timer {
            timer.abort();
        }
        self.display.busy = false;

        match deploy.stage {
            DeployStage::Announced => {
                info!(deploy = deploy.id, "deploy cancelled before disconnect");
                self.display.load_enabled = self.session.is_connected();
                self.display.status = "deploy cancelled".to_string();
            }
            stage => {
                warn!(deploy = deploy.id, ?stage, "deploy cancelled; device left disconnected");
                self.display.status = format!(
                    "deploy cancelled; device on {} left disconnected",
                    deploy.request.port
                );
                self.poll_ports();
            }
        }
    }

    /// The deploy tool exited after a cancel: skip settle and reconnect.
    fn finish_cancelled(&mut self, result: Result<(), DeployError>) {
        let Phase::Deploying(deploy) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return;
        };
        match &result {
            Ok(()) => warn!(deploy = deploy.id, "deploy cancelled; reconnect skipped"),
            Err(e) => warn!(deploy = deploy.id, error = %e, "deploy cancelled; tool failed"),
        }
        self.display.busy = false;
        self.display.status = format!(
            "deploy cancelled; device on {} left disconnected",
            deploy.request.port
        );
        self.poll_ports();
    }

    fn shutdown(&mut self) {
        if let Phase::Deploying(deploy) = std::mem::replace(&mut self.phase, Phase::Idle) {
            if let Some(timer) = deploy.timer {
                timer.abort();
            }
            warn!(deploy = deploy.id, stage = ?deploy.stage, "shutting down during deploy");
        }
        self.session.disconnect();
        self.display.clear_session();
        self.display.busy = false;
        info!("session controller shutting down");
    }
}

/// Sending side of a spawned [`SessionController`].
#[derive(Debug)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
    display: watch::Receiver<DisplayState>,
    task: JoinHandle<()>,
}

impl ControllerHandle {
    pub async fn send(&self, command: Command) -> Result<(), ControllerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ControllerError::Stopped)
    }

    /// Queue a command without waiting, for synchronous callers.
    pub fn try_send(&self, command: Command) -> Result<(), ControllerError> {
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => ControllerError::QueueFull,
            TrySendError::Closed(_) => ControllerError::Stopped,
        })
    }

    /// Latest published display state.
    pub fn display(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.clone()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&DisplayState) -> bool,
    ) -> Result<DisplayState, ControllerError> {
        self.display
            .wait_for(predicate)
            .await
            .map(|state| state.clone())
            .map_err(|_| ControllerError::Stopped)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Disconnect, stop the controller and wait for its task.
    pub async fn shutdown(self) -> Result<(), ControllerError> {
        // Already stopped is fine; the join below is what matters.
        let _ = self.commands.send(Command::Shutdown).await;
        self.task.await?;
        Ok(())
    }
}
