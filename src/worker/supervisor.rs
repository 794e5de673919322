//! Worker supervision.
//!
//! # Responsibilities
//! - Launch at most `max_workers` children, one per service, in order
//! - Keep the parent alive while they run (`wait_all`)
//! - Report every exit, including spawn failures, without touching siblings
//!
//! # Design Decisions
//! - Workers are OS processes; each gets its own copy of its parameters
//! - No restart or health checking; `wait_any` is the hook for adding one
//! - On shutdown, workers are sent SIGTERM and get a grace period to exit,
//!   then are killed

use std::process::ExitStatus;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::config::schema::ServiceEndpoint;
use crate::worker::launcher::WorkerCommand;
use crate::worker::spec::{LaunchError, LocalEndpoint, WorkerSpec};

/// Number of workers launched for `count` services.
pub fn pool_size(count: usize, max_workers: usize) -> usize {
    count.min(max_workers)
}

/// How a worker ended.
#[derive(Debug)]
pub enum Outcome {
    /// The process exited with this status.
    Exited(ExitStatus),
    /// The worker never started.
    LaunchFailed(LaunchError),
    /// Waiting on the process failed.
    WaitFailed(std::io::Error),
    /// Killed by the supervisor after the shutdown grace period.
    Killed,
}

/// Final report for one worker.
#[derive(Debug)]
pub struct WorkerExit {
    /// Position in the launch set (and HAProxy backend numbering).
    pub index: usize,
    pub server: String,
    pub outcome: Outcome,
}

impl WorkerExit {
    /// True when the worker exited with status 0.
    pub fn is_clean(&self) -> bool {
        matches!(&self.outcome, Outcome::Exited(status) if status.success())
    }
}

/// Starts and watches the worker fleet.
pub struct Supervisor<C> {
    command: C,
    max_workers: usize,
    grace: Duration,
}

impl<C: WorkerCommand> Supervisor<C> {
    pub fn new(command: C, max_workers: usize, grace: Duration) -> Self {
        Self {
            command,
            max_workers,
            grace,
        }
    }

    /// The services that will be launched, in order.
    pub fn launch_set<'a>(&self, services: &'a [ServiceEndpoint]) -> &'a [ServiceEndpoint] {
        &services[..pool_size(services.len(), self.max_workers)]
    }

    /// Spawn one worker per service in the launch set.
    ///
    /// Must be called inside a Tokio runtime. Spawn failures are logged and
    /// surface as [`Outcome::LaunchFailed`] from the returned [`Fleet`].
    pub fn launch(&self, services: &[ServiceEndpoint]) -> Fleet {
        let launch = self.launch_set(services);
        if launch.len() < services.len() {
            tracing::warn!(
                launched = launch.len(),
                skipped = services.len() - launch.len(),
                "Worker bound reached; remaining services not launched"
            );
        }

        let mut tasks = JoinSet::new();
        let mut endpoints = Vec::with_capacity(launch.len());
        let mut pids = vec![None; launch.len()];

        for (index, service) in launch.iter().enumerate() {
            let server = service.server.clone();
            let spec = match WorkerSpec::try_from(service) {
                Ok(spec) => spec,
                Err(e) => {
                    tracing::error!(index, server = %server, error = %e, "Worker not started");
                    tasks.spawn(async move { WorkerExit { index, server, outcome: Outcome::LaunchFailed(e) } });
                    continue;
                }
            };
            let endpoint = spec.local.clone();
            endpoints.push(endpoint.clone());

            let mut cmd = self.command.command(&spec);
            cmd.kill_on_drop(true);

            match cmd.spawn() {
                Ok(mut child) => {
                    pids[index] = child.id();
                    tracing::info!(
                        index,
                        server = %server,
                        server_port = spec.server_port,
                        local = %endpoint,
                        pid = ?child.id(),
                        "Worker started"
                    );
                    tasks.spawn(async move {
                        let outcome = match child.wait().await {
                            Ok(status) => Outcome::Exited(status),
                            Err(e) => Outcome::WaitFailed(e),
                        };
                        WorkerExit { index, server, outcome }
                    });
                }
                Err(source) => {
                    let e = LaunchError::Spawn { endpoint, source };
                    tracing::error!(index, server = %server, error = %e, "Worker not started");
                    tasks.spawn(async move { WorkerExit { index, server, outcome: Outcome::LaunchFailed(e) } });
                }
            }
        }

        Fleet {
            tasks,
            endpoints,
            servers: launch.iter().map(|s| s.server.clone()).collect(),
            pids,
            grace: self.grace,
        }
    }
}

/// The running workers.
pub struct Fleet {
    tasks: JoinSet<WorkerExit>,
    endpoints: Vec<LocalEndpoint>,
    servers: Vec<String>,
    /// Child pid per launch position; `None` when the worker never started.
    pids: Vec<Option<u32>>,
    grace: Duration,
}

impl Fleet {
    /// Local endpoints of the launch set, in launch order.
    pub fn endpoints(&self) -> &[LocalEndpoint] {
        &self.endpoints
    }

    /// Workers not yet reported as exited.
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for the next worker to exit. `None` once all have been reported.
    pub async fn wait_any(&mut self) -> Option<WorkerExit> {
        loop {
            match self.tasks.join_next().await? {
                Ok(exit) => {
                    log_exit(&exit);
                    return Some(exit);
                }
                Err(e) => tracing::error!(error = %e, "Worker task failed"),
            }
        }
    }

    /// Block until every worker has exited.
    ///
    /// Proxy workers run until signalled, so under normal operation this
    /// returns only after `shutdown` fires and the fleet is drained.
    pub async fn wait_all(mut self, mut shutdown: broadcast::Receiver<()>) -> Vec<WorkerExit> {
        let mut exits = Vec::with_capacity(self.tasks.len());
        let mut signal_open = true;

        loop {
            tokio::select! {
                exit = self.wait_any() => match exit {
                    Some(exit) => exits.push(exit),
                    None => return exits,
                },
                res = shutdown.recv(), if signal_open => match res {
                    Err(broadcast::error::RecvError::Closed) => signal_open = false,
                    _ => break,
                },
            }
        }

        let grace = self.grace;
        tracing::info!(running = self.running(), grace = ?grace, "Shutdown requested, draining workers");
        self.terminate(&exits);
        let drain = async {
            while let Some(exit) = self.wait_any().await {
                exits.push(exit);
            }
        };
        if tokio::time::timeout(grace, drain).await.is_err() {
            tracing::warn!(running = self.running(), "Grace period elapsed, killing workers");
            self.tasks.abort_all();
            while let Some(result) = self.tasks.join_next().await {
                if let Ok(exit) = result {
                    exits.push(exit);
                }
            }
            let killed = self.killed(&exits);
            exits.extend(killed);
        }

        exits
    }

    /// Ask every worker not yet reported as exited to stop.
    fn terminate(&self, reported: &[WorkerExit]) {
        let live = self
            .pids
            .iter()
            .enumerate()
            .filter(|(i, _)| reported.iter().all(|e| e.index != *i))
            .filter_map(|(i, pid)| pid.map(|pid| (i, pid)));

        for (index, pid) in live {
            if let Err(e) = send_terminate(pid) {
                tracing::debug!(index, pid, error = %e, "Could not signal worker");
            }
        }
    }

    fn killed(&self, reported: &[WorkerExit]) -> Vec<WorkerExit> {
        self.servers
            .iter()
            .enumerate()
            .filter(|(i, _)| reported.iter().all(|e| e.index != *i))
            .map(|(index, server)| WorkerExit {
                index,
                server: server.clone(),
                outcome: Outcome::Killed,
            })
            .collect()
    }
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> std::io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
    // SAFETY: kill(2) only reads its arguments.
    if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn send_terminate(_pid: u32) -> std::io::Result<()> {
    Ok(())
}

fn log_exit(exit: &WorkerExit) {
    match &exit.outcome {
        Outcome::Exited(status) if status.success() => {
            tracing::info!(index = exit.index, server = %exit.server, "Worker exited");
        }
        Outcome::Exited(status) => {
            tracing::warn!(index = exit.index, server = %exit.server, status = %status, "Worker exited abnormally");
        }
        Outcome::LaunchFailed(e) => {
            tracing::debug!(index = exit.index, server = %exit.server, error = %e, "Worker failed to launch");
        }
        Outcome::WaitFailed(e) => {
            tracing::warn!(index = exit.index, server = %exit.server, error = %e, "Lost track of worker");
        }
        Outcome::Killed => {
            tracing::warn!(index = exit.index, server = %exit.server, "Worker killed");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::process::Command;

    /// Runs `sh -c <script>`; services on `fail_port` get a program that does not exist.
    struct Script {
        script: &'static str,
        fail_port: Option<u16>,
    }

    impl WorkerCommand for Script {
        fn command(&self, spec: &WorkerSpec) -> Command {
            if Some(spec.local.port) == self.fail_port {
                return Command::new("/nonexistent/proxy-client");
            }
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(self.script);
            cmd
        }
    }

    fn services(n: u16) -> Vec<ServiceEndpoint> {
        (0..n)
            .map(|i| {
                let mut s = ServiceEndpoint::new(format!("10.0.0.{}", i + 1), 8388);
                s.local_address = Some("127.0.0.1".into());
                s.local_port = Some(1080 + i);
                s
            })
            .collect()
    }

    fn supervisor(script: &'static str, fail_port: Option<u16>) -> Supervisor<Script> {
        Supervisor::new(Script { script, fail_port }, 5, Duration::from_millis(200))
    }

    #[test]
    fn test_pool_size() {
        assert_eq!(pool_size(3, 5), 3);
        assert_eq!(pool_size(8, 5), 5);
        assert_eq!(pool_size(0, 5), 0);
    }

    #[tokio::test]
    async fn test_launches_every_service_under_bound() {
        let shutdown = crate::lifecycle::Shutdown::new();
        let fleet = supervisor("exit 0", None).launch(&services(3));
        assert_eq!(fleet.endpoints().len(), 3);

        let mut exits = fleet.wait_all(shutdown.subscribe()).await;
        exits.sort_by_key(|e| e.index);
        assert_eq!(exits.len(), 3);
        assert!(exits.iter().all(WorkerExit::is_clean));
        assert_eq!(exits[2].server, "10.0.0.3");
    }

    #[tokio::test]
    async fn test_bound_caps_launches() {
        let shutdown = crate::lifecycle::Shutdown::new();
        let fleet = supervisor("exit 0", None).launch(&services(8));

        let ports: Vec<_> = fleet.endpoints().iter().map(|e| e.port).collect();
        assert_eq!(ports, vec![1080, 1081, 1082, 1083, 1084]);
        assert_eq!(fleet.wait_all(shutdown.subscribe()).await.len(), 5);
    }

    #[tokio::test]
    async fn test_spawn_failure_does_not_stop_siblings() {
        let shutdown = crate::lifecycle::Shutdown::new();
        let fleet = supervisor("exit 3", Some(1081)).launch(&services(3));

        let mut exits = fleet.wait_all(shutdown.subscribe()).await;
        exits.sort_by_key(|e| e.index);
        assert_eq!(exits.len(), 3);
        assert!(matches!(exits[1].outcome, Outcome::LaunchFailed(LaunchError::Spawn { .. })));
        for exit in [&exits[0], &exits[2]] {
            match &exit.outcome {
                Outcome::Exited(status) => assert_eq!(status.code(), Some(3)),
                other => panic!("unexpected outcome {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_wait_any_reports_each_exit_once() {
        let mut fleet = supervisor("exit 0", None).launch(&services(2));
        assert!(fleet.wait_any().await.is_some());
        assert!(fleet.wait_any().await.is_some());
        assert!(fleet.wait_any().await.is_none());
        assert_eq!(fleet.running(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_lets_workers_exit_on_sigterm() {
        let shutdown = crate::lifecycle::Shutdown::new();
        let fleet = Supervisor::new(
            Script {
                script: "trap 'exit 0' TERM; while :; do sleep 0.1; done",
                fail_port: None,
            },
            5,
            Duration::from_secs(5),
        )
        .launch(&services(2));
        let rx = shutdown.subscribe();

        let join = tokio::spawn(fleet.wait_all(rx));
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.trigger();

        let exits = tokio::time::timeout(Duration::from_secs(4), join)
            .await
            .expect("workers did not exit within the grace period")
            .unwrap();
        assert_eq!(exits.len(), 2);
        assert!(exits.iter().all(WorkerExit::is_clean), "{:?}", exits);
    }

    #[tokio::test]
    async fn test_shutdown_kills_after_grace() {
        let shutdown = crate::lifecycle::Shutdown::new();
        let fleet = supervisor("trap '' TERM; sleep 30", None).launch(&services(2));
        let rx = shutdown.subscribe();

        let join = tokio::spawn(fleet.wait_all(rx));
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.trigger();

        let exits = tokio::time::timeout(Duration::from_secs(5), join)
            .await
            .expect("join did not finish")
            .unwrap();
        assert_eq!(exits.len(), 2);
        assert!(exits.iter().all(|e| matches!(e.outcome, Outcome::Killed)));
    }

    #[tokio::test]
    async fn test_unnormalized_service_is_reported() {
        let shutdown = crate::lifecycle::Shutdown::new();
        let mut svc = services(2);
        svc[0].local_port = None;

        let fleet = supervisor("exit 0", None).launch(&svc);
        assert_eq!(fleet.endpoints().len(), 1);

        let mut exits = fleet.wait_all(shutdown.subscribe()).await;
        exits.sort_by_key(|e| e.index);
        assert!(matches!(exits[0].outcome, Outcome::LaunchFailed(LaunchError::Unnormalized { .. })));
        assert!(exits[1].is_clean());
    }
}
