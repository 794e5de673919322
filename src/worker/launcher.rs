//! Turning a [`WorkerSpec`] into a child process command.

use std::ffi::OsString;

use tokio::process::Command;

use crate::config::schema::WorkerSettings;
use crate::worker::spec::WorkerSpec;

/// Builds the command that runs one worker.
///
/// The supervisor only needs a ready-to-spawn [`Command`]; tests swap in
/// commands that exit on their own.
pub trait WorkerCommand: Send + Sync {
    fn command(&self, spec: &WorkerSpec) -> Command;
}

/// Runs the ShadowsocksR client with one service's parameters as flags.
#[derive(Debug, Clone)]
pub struct ProxyClientCommand {
    program: String,
    args: Vec<String>,
}

impl ProxyClientCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_settings(settings: &WorkerSettings) -> Self {
        Self::new(settings.program.as_str(), settings.args.clone())
    }

    /// Per-service flags, in the client's `-s -p -k -b -l -m -O -G -o -g` order.
    pub fn flags(spec: &WorkerSpec) -> Vec<OsString> {
        vec![
            "-s".into(),
            spec.server.as_str().into(),
            "-p".into(),
            spec.server_port.to_string().into(),
            "-k".into(),
            password_arg(&spec.password),
            "-b".into(),
            spec.local.address.as_str().into(),
            "-l".into(),
            spec.local.port.to_string().into(),
            "-m".into(),
            spec.method.as_str().into(),
            "-O".into(),
            spec.protocol.as_str().into(),
            "-G".into(),
            spec.protocol_param.as_str().into(),
            "-o".into(),
            spec.obfs.as_str().into(),
            "-g".into(),
            spec.obfs_param.as_str().into(),
        ]
    }
}

impl WorkerCommand for ProxyClientCommand {
    fn command(&self, spec: &WorkerSpec) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).args(Self::flags(spec));
        cmd
    }
}

#[cfg(unix)]
fn password_arg(password: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(password).to_os_string()
}

#[cfg(not(unix))]
fn password_arg(password: &[u8]) -> OsString {
    String::from_utf8_lossy(password).into_owned().into()
}
