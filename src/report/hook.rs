//! External command run for every working proxy

use std::io;
use std::process::ExitStatus;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

/// Command executed after each successful probe
///
/// The command line is interpreted by `sh`, and receives the host, the port
/// and the elapsed microseconds as positional arguments. Arguments are passed
/// verbatim, so hostile hostnames cannot inject shell syntax. Invocations are
/// serialized: only one hook process runs at a time across the whole pool.
pub struct GoodHook {
    command: String,
    lock: Mutex<()>,
}

impl GoodHook {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn build_command(&self, host: &str, port: u16, elapsed_micros: u64) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("{} \"$@\"", self.command))
            .arg("sh")
            .arg(host)
            .arg(port.to_string())
            .arg(elapsed_micros.to_string());
        cmd
    }

    /// Run the hook and wait for it to exit
    pub async fn run(&self, host: &str, port: u16, elapsed_micros: u64) -> io::Result<ExitStatus> {
        let _guard = self.lock.lock().await;
        debug!(hook = %self.command, host, port, "running good hook");
        self.build_command(host, port, elapsed_micros).status().await
    }
}

impl std::fmt::Debug for GoodHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoodHook")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}
