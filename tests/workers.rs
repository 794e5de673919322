//! Worker launch through the real proxy client command builder.
#![cfg(unix)]

use std::time::Duration;

use proxy_fleet::config::schema::LauncherSettings;
use proxy_fleet::lifecycle::{prepare, Shutdown, StartupOptions};
use proxy_fleet::worker::{Outcome, ProxyClientCommand, Supervisor};
use serde_json::json;

mod common;

/// `sh -c SCRIPT worker <flags>`: the flags become `$1..`.
fn shell_client(script: &str) -> ProxyClientCommand {
    ProxyClientCommand::new("sh", vec!["-c".into(), script.into(), "worker".into()])
}

#[tokio::test]
async fn test_workers_receive_service_flags() {
    let (_dir, path) = common::write_fleet(&json!({ "configs": common::services(3) }));
    let options = StartupOptions {
        fleet_path: path,
        persist: false,
        max_workers: 5,
    };
    let prepared = prepare(&options, &LauncherSettings::default()).unwrap();

    let script = r#"test "$1" = -s && test "$5" = -k && test "$6" = secret && test "$9" = -l && test "${10}" -ge 1080 && exit 0; exit 7"#;
    let supervisor = Supervisor::new(shell_client(script), 5, Duration::from_secs(1));
    let fleet = supervisor.launch(&prepared.launch);
    assert_eq!(fleet.endpoints(), prepared.endpoints().as_slice());

    let shutdown = Shutdown::new();
    let exits = fleet.wait_all(shutdown.subscribe()).await;
    assert_eq!(exits.len(), 3);
    for exit in &exits {
        assert!(exit.is_clean(), "worker {} failed: {:?}", exit.index, exit.outcome);
    }
}

#[tokio::test]
async fn test_missing_client_binary_reports_every_worker() {
    let (_dir, path) = common::write_fleet(&json!({ "configs": common::services(2) }));
    let options = StartupOptions {
        fleet_path: path,
        persist: false,
        max_workers: 5,
    };
    let prepared = prepare(&options, &LauncherSettings::default()).unwrap();

    let client = ProxyClientCommand::new("/nonexistent/ssr-local", Vec::new());
    let fleet = Supervisor::new(client, 5, Duration::from_secs(1)).launch(&prepared.launch);

    let shutdown = Shutdown::new();
    let exits = fleet.wait_all(shutdown.subscribe()).await;
    assert_eq!(exits.len(), 2);
    assert!(exits.iter().all(|e| matches!(e.outcome, Outcome::LaunchFailed(_))));
}
