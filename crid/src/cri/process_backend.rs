/* -------------------------------------------------------------------------- *\
 *                |   █████╗ ██╗   ██╗██████╗  █████╗ ███████╗ |              *
 *                |  ██╔══██╗██║   ██║██╔══██╗██╔══██╗██╔════╝ |              *
 *                |  ███████║██║   ██║██████╔╝███████║█████╗   |              *
 *                |  ██╔══██║██║   ██║██╔══██╗██╔══██║██╔══╝   |              *
 *                |  ██║  ██║╚██████╔╝██║  ██║██║  ██║███████╗ |              *
 *                |  ╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝ |              *
 *                +--------------------------------------------+              *
 *                                                                            *
 *                         Distributed Systems Runtime                        *
 * -------------------------------------------------------------------------- *
 * Copyright 2022 - 2024, the aurae contributors                              *
 * SPDX-License-Identifier: Apache-2.0                                        *
\* -------------------------------------------------------------------------- */

use super::runtime_backend::{
    BackendError, BackendOutput, ExecStatus, ExecTarget, RuntimeBackend,
};
use crate::config::ExecConfig;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

const SIGNAL_EXIT_BASE: i32 = 128;

/// Runs exec commands as host processes.
///
/// When the target has a pid the command is wrapped in `nsenter` to join
/// that process's namespaces. Otherwise it runs directly on the host, but
/// only if [ExecConfig::host_exec] allows it. Every exec gets
/// its own process group so a timeout kills anything the command forked.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    nsenter: PathBuf,
    host_exec: bool,
    max_output_bytes: usize,
    drain_timeout: Duration,
}

impl ProcessBackend {
    pub fn new(config: &ExecConfig) -> Self {
        Self {
            nsenter: config.nsenter.clone(),
            host_exec: config.host_exec,
            max_output_bytes: config.max_output_bytes,
            drain_timeout: config.drain_timeout(),
        }
    }

    fn command(
        &self,
        target: &ExecTarget,
        program: &str,
        args: &[String],
    ) -> Command {
        let mut command = match target.pid {
            Some(pid) => {
                let mut command = Command::new(&self.nsenter);
                let _ = command
                    .arg("--target")
                    .arg(pid.to_string())
                    .args(["--mount", "--uts", "--ipc", "--net", "--pid", "--"])
                    .arg(program)
                    .args(args);
                command
            }
            None => {
                let mut command = Command::new(program);
                let _ = command.args(args);
                command
            }
        };

        let _ = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        command
    }

    /// Waits for whatever the readers can still collect, up to the drain
    /// timeout. Readers blocked on a pipe held open by an orphan are
    /// abandoned.
    async fn drain(&self, readers: Vec<JoinHandle<()>>) {
        let deadline = Instant::now() + self.drain_timeout;
        for mut reader in readers {
            if tokio::time::timeout_at(deadline, &mut reader).await.is_err() {
                debug!("exec pipe still open after drain timeout");
                reader.abort();
            }
        }
    }
}

#[tonic::async_trait]
impl RuntimeBackend for ProcessBackend {
    #[tracing::instrument(
        skip(self, target),
        fields(container_id = %target.container_id)
    )]
    async fn exec_in_container(
        &self,
        target: &ExecTarget,
        command: &[String],
        deadline: Option<Instant>,
    ) -> Result<BackendOutput, BackendError> {
        let Some((program, args)) = command.split_first() else {
            return Err(BackendError::EmptyCommand);
        };
        if target.pid.is_none() && !self.host_exec {
            return Err(BackendError::NoNamespaceTarget {
                container_id: target.container_id.clone(),
            });
        }

        let mut child =
            self.command(target, program, args).spawn().map_err(|source| {
                BackendError::Spawn { program: program.clone(), source }
            })?;
        // the child leads its own group
        let pgid = child
            .id()
            .and_then(|id| i32::try_from(id).ok())
            .map(Pid::from_raw);

        let stdout = CaptureBuffer::new(self.max_output_bytes);
        let stderr = CaptureBuffer::new(self.max_output_bytes);
        let mut readers = Vec::with_capacity(2);
        if let Some(pipe) = child.stdout.take() {
            readers.push(tokio::spawn(stdout.clone().fill(pipe)));
        }
        if let Some(pipe) = child.stderr.take() {
            readers.push(tokio::spawn(stderr.clone().fill(pipe)));
        }

        let exited = match deadline {
            None => Some(child.wait().await),
            Some(deadline) => {
                tokio::time::timeout_at(deadline, child.wait()).await.ok()
            }
        };

        let status = match exited {
            Some(status) => {
                let status =
                    status.map_err(|source| BackendError::Wait { source })?;
                ExecStatus::Exited(exit_code(status))
            }
            None => {
                warn!("exec deadline elapsed, killing process group");
                kill(&mut child, pgid).await?;
                ExecStatus::TimedOut
            }
        };

        self.drain(readers).await;

        Ok(BackendOutput { stdout: stdout.take(), stderr: stderr.take(), status })
    }
}

async fn kill(child: &mut Child, pgid: Option<Pid>) -> Result<(), BackendError> {
    if let Some(pgid) = pgid {
        match killpg(pgid, Signal::SIGKILL) {
            // ESRCH: the whole group is already gone
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!(?pgid, "failed to kill exec process group: {e}"),
        }
    }
    // reaps the group leader
    child.kill().await.map_err(|source| BackendError::Kill { source })
}

fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => SIGNAL_EXIT_BASE + signal,
        (None, None) => SIGNAL_EXIT_BASE,
    }
}

/// A bounded byte sink shared between a pipe reader and the caller.
#[derive(Debug, Clone)]
struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
    limit: usize,
}

impl CaptureBuffer {
    fn new(limit: usize) -> Self {
        Self { bytes: Arc::new(Mutex::new(Vec::new())), limit }
    }

    /// Reads `pipe` to EOF. Bytes past the limit are discarded, but the
    /// pipe keeps being read so the writer never blocks.
    async fn fill<R: AsyncRead + Unpin>(self, mut pipe: R) {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => self.append(&chunk[..n]),
            }
        }
    }

    fn append(&self, chunk: &[u8]) {
        let mut bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        let room = self.limit.saturating_sub(bytes.len());
        bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    fn take(&self) -> Vec<u8> {
        let mut bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cri::container::ContainerId;
    use pretty_assertions::assert_eq;
    use test_helpers::*;

    fn backend() -> ProcessBackend {
        ProcessBackend::new(&ExecConfig { host_exec: true, ..ExecConfig::default() })
    }

    fn host_target() -> ExecTarget {
        ExecTarget { container_id: ContainerId::new("c1"), pid: None }
    }

    fn cmd(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let output = backend()
            .exec_in_container(&host_target(), &cmd(&["echo", "hi"]), None)
            .await
            .expect("exec");

        assert_eq!(output.stdout, b"hi\n".to_vec());
        assert!(output.stderr.is_empty());
        assert_eq!(output.status, ExecStatus::Exited(0));
    }

    #[tokio::test]
    async fn reports_non_zero_exit_and_stderr() {
        let output = backend()
            .exec_in_container(
                &host_target(),
                &cmd(&["sh", "-c", "echo oops >&2; exit 7"]),
                Some(Instant::now() + Duration::from_secs(10)),
            )
            .await
            .expect("exec");

        assert_eq!(output.stderr, b"oops\n".to_vec());
        assert_eq!(output.status, ExecStatus::Exited(7));
    }

    #[tokio::test]
    async fn signal_death_is_reported_as_128_plus_signal() {
        let output = backend()
            .exec_in_container(&host_target(), &cmd(&["sh", "-c", "kill -9 $$"]), None)
            .await
            .expect("exec");

        assert_eq!(output.status, ExecStatus::Exited(137));
    }

    #[tokio::test]
    async fn deadline_kills_process_and_keeps_partial_output() {
        let started = Instant::now();
        let output = backend()
            .exec_in_container(
                &host_target(),
                &cmd(&["sh", "-c", "echo started; sleep 30"]),
                Some(started + Duration::from_secs(1)),
            )
            .await
            .expect("exec");

        assert_eq!(output.status, ExecStatus::TimedOut);
        assert_eq!(output.stdout, b"started\n".to_vec());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn output_is_capped() {
        let backend = ProcessBackend::new(&ExecConfig {
            max_output_bytes: 4,
            host_exec: true,
            ..ExecConfig::default()
        });
        let output = backend
            .exec_in_container(&host_target(), &cmd(&["printf", "0123456789"]), None)
            .await
            .expect("exec");

        assert_eq!(output.stdout, b"0123".to_vec());
        assert_eq!(output.status, ExecStatus::Exited(0));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = backend()
            .exec_in_container(&host_target(), &cmd(&["/crid/no/such/binary"]), None)
            .await
            .expect_err("spawned a missing binary");

        assert!(matches!(err, BackendError::Spawn { .. }));
    }

    #[tokio::test]
    async fn host_exec_is_refused_unless_enabled() {
        let backend = ProcessBackend::new(&ExecConfig::default());
        let err = backend
            .exec_in_container(&host_target(), &cmd(&["echo", "hi"]), None)
            .await
            .expect_err("ran on the host without opting in");

        assert!(matches!(err, BackendError::NoNamespaceTarget { .. }));
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let err = backend()
            .exec_in_container(&host_target(), &[], None)
            .await
            .expect_err("ran an empty command");
        assert!(matches!(err, BackendError::EmptyCommand));
    }

    #[tokio::test]
    async fn joins_target_namespaces_with_nsenter() {
        skip_if_not_root!("joins_target_namespaces_with_nsenter");
        skip_if_seccomp!("joins_target_namespaces_with_nsenter");
        skip_if_missing_binary!("joins_target_namespaces_with_nsenter", "nsenter");

        let target = ExecTarget {
            container_id: ContainerId::new("c1"),
            pid: i32::try_from(std::process::id()).ok().map(Pid::from_raw),
        };
        let output = backend()
            .exec_in_container(&target, &cmd(&["echo", "inside"]), None)
            .await
            .expect("exec");

        assert_eq!(output.stdout, b"inside\n".to_vec());
        assert_eq!(output.status, ExecStatus::Exited(0));
    }
}
