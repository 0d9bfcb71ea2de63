//! The load-config workflow end to end against in-memory collaborators:
//! validate, announce, disconnect, deploy, settle, reconnect.

mod common;

use common::{advance, idle, two_doors, Harness, PRE_DEPLOY, SETTLE};
use pretty_assertions::assert_eq;
use servodoor::config::DeployFailurePolicy;
use servodoor::controller::{Command, CANCEL_PENDING, DEPLOY_ANNOUNCEMENT};
use servodoor::device::DeviceCall;
use servodoor::pipeline::{DeployRequest, RecordingDeployer};
use std::time::Duration;

const DOORS_JSON: &str = r#"{"east": {"pin": 2}, "north": {"pin": 3}}"#;

async fn connected(connector: servodoor::device::MockConnector, policy: DeployFailurePolicy) -> Harness {
    let harness = Harness::start(connector, policy);
    harness.open("COM5").await;
    harness.connector.clear_calls();
    harness
}

fn load(path: &std::path::Path) -> Command {
    Command::LoadConfig {
        path: path.display().to_string(),
    }
}

fn has_connect(calls: &[DeviceCall]) -> bool {
    calls.iter().any(|c| matches!(c, DeviceCall::Connect(_)))
}

#[tokio::test(start_paused = true)]
async fn test_successful_deploy_sequence() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness.send(load(&file)).await;

    // Announced: the session is still open and nothing has been touched.
    let display = harness.handle.display();
    assert_eq!(display.status, DEPLOY_ANNOUNCEMENT);
    assert!(display.busy);
    assert!(!display.load_enabled);
    assert!(display.is_connected());
    assert!(harness.connector.calls().is_empty());
    assert!(harness.deployer.calls().is_empty());

    advance(PRE_DEPLOY).await;
    idle().await;

    assert_eq!(harness.connector.calls(), vec![DeviceCall::Close]);
    assert_eq!(
        harness.deployer.calls(),
        vec![DeployRequest {
            file: file.clone(),
            port: "COM5".into(),
        }]
    );
    let display = harness.handle.display();
    assert!(!display.is_connected());
    assert!(display.busy);

    // Still settling just before the delay runs out.
    advance(SETTLE - Duration::from_millis(50)).await;
    assert_eq!(harness.connector.calls(), vec![DeviceCall::Close]);

    advance(Duration::from_millis(100)).await;
    assert_eq!(
        harness.connector.calls(),
        vec![
            DeviceCall::Close,
            DeviceCall::Connect("COM5".into()),
            DeviceCall::GetConfigErrors,
            DeviceCall::GetConfig,
            DeviceCall::GetDoors,
        ]
    );
    assert_eq!(harness.connector.ordering_violations(), 0);

    let display = harness.handle.display();
    assert!(!display.busy);
    assert!(display.load_enabled);
    assert_eq!(display.connected_port.as_deref(), Some("COM5"));
    assert_eq!(display.door_names, vec!["east", "north"]);
    assert_eq!(display.status, "configuration deployed to COM5");
}

#[tokio::test(start_paused = true)]
async fn test_invalid_json_never_disconnects() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    let file = harness.write_config("broken.json", "{not valid json");

    harness.send(load(&file)).await;
    advance(PRE_DEPLOY + SETTLE * 2).await;

    let display = harness.handle.display();
    assert!(display.error_visible);
    assert!(display.error_message.contains("does not contain valid json"));
    assert!(display.is_connected());
    assert!(!display.busy);
    assert!(harness.connector.calls().is_empty());
    assert!(harness.deployer.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_file_is_rejected() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    let file = harness.dir.path().join("absent.json");

    harness.send(load(&file)).await;
    advance(PRE_DEPLOY + SETTLE).await;

    assert!(harness.handle.display().error_visible);
    assert!(harness.connector.calls().is_empty());
    assert!(harness.deployer.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_file_uri_prefix_is_stripped() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness
        .send(Command::LoadConfig {
            path: format!("file://{}", file.display()),
        })
        .await;
    advance(PRE_DEPLOY).await;
    idle().await;

    assert_eq!(harness.deployer.calls()[0].file, file);
}

#[tokio::test(start_paused = true)]
async fn test_load_without_session_does_nothing() {
    let harness = Harness::start(two_doors(), DeployFailurePolicy::Abort);
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness.send(load(&file)).await;
    advance(PRE_DEPLOY + SETTLE).await;

    assert_eq!(
        harness.handle.display().status,
        "no device connected; nothing to load"
    );
    assert!(harness.connector.calls().is_empty());
    assert!(harness.deployer.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_deploy_aborts_reconnect() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    harness.deployer.fail(true);
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness.send(load(&file)).await;
    advance(PRE_DEPLOY).await;
    idle().await;

    let display = harness.handle.display();
    assert!(!display.busy);
    assert!(!display.is_connected());
    assert!(display.error_visible);
    assert!(display
        .error_message
        .starts_with("deploy failed, device left disconnected"));
    assert_eq!(display.status, "deploy failed");

    advance(SETTLE * 2).await;
    assert_eq!(harness.connector.calls(), vec![DeviceCall::Close]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_deploy_can_reconnect_anyway() {
    let harness = connected(two_doors(), DeployFailurePolicy::Proceed).await;
    harness.deployer.fail(true);
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness.send(load(&file)).await;
    advance(PRE_DEPLOY).await;
    idle().await;
    assert!(harness
        .handle
        .display()
        .status
        .ends_with("reconnecting anyway"));

    advance(SETTLE).await;
    idle().await;

    let display = harness.handle.display();
    assert!(display.is_connected());
    assert!(!display.busy);
    assert!(display
        .status
        .starts_with("reconnected to COM5 after failed deploy"));
    assert!(has_connect(&harness.connector.calls()));
}

#[tokio::test(start_paused = true)]
async fn test_failed_deploy_and_failed_reconnect_reports_both() {
    let harness = connected(two_doors(), DeployFailurePolicy::Proceed).await;
    harness.deployer.fail(true);
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness.send(load(&file)).await;
    advance(PRE_DEPLOY).await;
    idle().await;
    harness.connector.fail_connect(true);
    advance(SETTLE).await;
    idle().await;

    let display = harness.handle.display();
    assert!(!display.is_connected());
    assert!(!display.busy);
    assert!(display.error_visible);
    assert!(display.error_message.starts_with("deploy failed ("));
    assert!(display.error_message.contains("could not enter raw repl"));
    assert!(display.error_message.contains("could not open COM5"));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_failure_leaves_session_closed() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness.send(load(&file)).await;
    advance(PRE_DEPLOY).await;
    idle().await;
    harness.connector.fail_connect(true);
    advance(SETTLE).await;
    idle().await;

    let display = harness.handle.display();
    assert!(!display.is_connected());
    assert!(!display.busy);
    assert!(display.error_visible);
    assert!(display.error_message.starts_with("could not open COM5"));
}

#[tokio::test(start_paused = true)]
async fn test_session_commands_rejected_while_deploying() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    let file = harness.write_config("doors.json", DOORS_JSON);
    harness.send(load(&file)).await;

    harness.open("COM5").await;
    assert_eq!(harness.handle.display().status, "busy: deploy in progress");
    assert!(harness.handle.display().is_connected());

    harness
        .send(Command::ToggleDoor {
            index: 0,
            name: "east".into(),
            open: false,
        })
        .await;
    harness.send(load(&file)).await;
    assert!(harness.connector.calls().is_empty());

    advance(PRE_DEPLOY).await;
    idle().await;
    // Rejected during the settle wait as well.
    harness.open("COM6").await;
    assert_eq!(harness.handle.display().status, "busy: deploy in progress");

    advance(SETTLE).await;
    idle().await;
    assert_eq!(harness.deployer.calls().len(), 1);
    assert!(!harness
        .connector
        .calls()
        .contains(&DeviceCall::Connect("COM6".into())));
}

#[tokio::test(start_paused = true)]
async fn test_no_port_polls_during_deploy() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    let polls = harness.directory.polls();
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness.send(load(&file)).await;
    advance(PRE_DEPLOY).await;
    idle().await;
    // Injected ticks are held off too.
    harness.send(Command::Tick).await;
    advance(SETTLE).await;
    idle().await;

    assert!(harness.handle.display().is_connected());
    assert_eq!(harness.directory.polls(), polls);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_disconnect_keeps_session() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness.send(load(&file)).await;
    harness.send(Command::Cancel).await;
    advance(PRE_DEPLOY + SETTLE * 2).await;

    let display = harness.handle.display();
    assert_eq!(display.status, "deploy cancelled");
    assert!(display.is_connected());
    assert!(display.load_enabled);
    assert!(!display.busy);
    assert!(harness.connector.calls().is_empty());
    assert!(harness.deployer.calls().is_empty());
}

/// Harness with a gated deployer, connected to COM5, whose deploy is now
/// blocked inside the recorder.
///
/// Once the deploy is blocked the paused clock stops advancing, so callers
/// must not sleep until they call `release()`.
async fn blocked_in_deploy() -> Harness {
    let deployer = RecordingDeployer::gated();
    let mut harness = Harness::start_with(two_doors(), deployer, DeployFailurePolicy::Abort);
    harness.open("COM5").await;
    harness.connector.clear_calls();
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness.send(load(&file)).await;
    harness
        .handle
        .wait_for(|d| d.busy && !d.is_connected())
        .await
        .unwrap();
    harness
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_deploying_waits_for_the_tool() {
    let mut harness = blocked_in_deploy().await;

    harness.handle.send(Command::Cancel).await.unwrap();
    let display = harness
        .handle
        .wait_for(|d| d.status == CANCEL_PENDING)
        .await
        .unwrap();
    assert!(display.busy);
    assert!(!display.is_connected());

    harness.deployer.release();
    let display = harness.handle.wait_for(|d| !d.busy).await.unwrap();
    assert_eq!(
        display.status,
        "deploy cancelled; device on COM5 left disconnected"
    );

    // No settle, no reconnect.
    advance(SETTLE * 2).await;
    assert_eq!(harness.connector.calls(), vec![DeviceCall::Close]);
    assert!(!harness.handle.display().is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_open_rejected_until_cancelled_deploy_exits() {
    let mut harness = blocked_in_deploy().await;
    let polls = harness.directory.polls();

    harness.handle.send(Command::Cancel).await.unwrap();
    harness.handle.send(Command::Cancel).await.unwrap();
    harness
        .handle
        .send(Command::OpenClose { port: "COM5".into() })
        .await
        .unwrap();
    harness.handle.send(Command::Tick).await.unwrap();
    let display = harness
        .handle
        .wait_for(|d| d.status == "busy: deploy in progress")
        .await
        .unwrap();

    assert!(display.busy);
    assert!(!display.is_connected());
    assert_eq!(harness.connector.calls(), vec![DeviceCall::Close]);
    assert_eq!(harness.directory.polls(), polls);

    harness.deployer.release();
    harness.handle.wait_for(|d| !d.busy).await.unwrap();
    assert!(harness.directory.polls() > polls);

    harness.open("COM5").await;
    assert!(harness.handle.display().is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_settling_skips_reconnect() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    let polls = harness.directory.polls();
    let file = harness.write_config("doors.json", DOORS_JSON);

    harness.send(load(&file)).await;
    advance(PRE_DEPLOY).await;
    idle().await;
    harness.send(Command::Cancel).await;
    advance(SETTLE * 2).await;

    let display = harness.handle.display();
    assert!(!display.busy);
    assert!(!display.is_connected());
    assert!(!has_connect(&harness.connector.calls()));
    // Polling resumes once nothing is in flight.
    assert!(harness.directory.polls() > polls);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_with_nothing_in_flight() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;

    harness.send(Command::Cancel).await;

    assert_eq!(harness.handle.display().status, "nothing to cancel");
    assert!(harness.handle.display().is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_second_deploy_after_first_completes() {
    let harness = connected(two_doors(), DeployFailurePolicy::Abort).await;
    let first = harness.write_config("first.json", DOORS_JSON);
    let second = harness.write_config("second.json", r#"{"west": {}}"#);

    harness.send(load(&first)).await;
    advance(PRE_DEPLOY + SETTLE).await;
    idle().await;
    harness.connector.set_config(
        [("west".to_string(), serde_json::json!({}))]
            .into_iter()
            .collect(),
    );
    harness.send(load(&second)).await;
    advance(PRE_DEPLOY + SETTLE).await;
    idle().await;

    let files: Vec<_> = harness
        .deployer
        .calls()
        .into_iter()
        .map(|request| request.file)
        .collect();
    assert_eq!(files, vec![first, second]);
    assert_eq!(harness.handle.display().door_names, vec!["west"]);
}
