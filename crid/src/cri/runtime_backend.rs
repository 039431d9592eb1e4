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

use super::container::ContainerId;
use nix::unistd::Pid;
use std::fmt::Debug;
use std::io;
use thiserror::Error;
use tokio::time::Instant;

/// Where an exec runs: a running container and, if it has one, the pid
/// whose namespaces the command joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecTarget {
    pub container_id: ContainerId,
    pub pid: Option<Pid>,
}

/// How an exec process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    /// The process exited on its own. A process killed by a signal reports
    /// `128 + signal`.
    Exited(i32),
    /// The deadline elapsed and the process was killed.
    TimedOut,
}

impl ExecStatus {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecStatus::Exited(code) => Some(*code),
            ExecStatus::TimedOut => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, ExecStatus::TimedOut)
    }
}

/// Captured output of an exec. Both streams are bounded by the backend's
/// output cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: ExecStatus,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no command to run")]
    EmptyCommand,
    #[error("container '{container_id}' has no process to exec in and host exec is disabled")]
    NoNamespaceTarget { container_id: ContainerId },
    #[error("failed to spawn '{program}': {source}")]
    Spawn { program: String, source: io::Error },
    #[error("failed to wait for exec process: {source}")]
    Wait { source: io::Error },
    #[error("failed to kill exec process: {source}")]
    Kill { source: io::Error },
}

/// Runs commands inside containers.
#[tonic::async_trait]
pub trait RuntimeBackend: Send + Sync + Debug {
    /// Runs `command` in `target` and waits for it.
    ///
    /// With a `deadline`, the backend must kill the process once it elapses
    /// and return [ExecStatus::TimedOut] with whatever output was captured.
    /// Without one it waits for the process however long it runs.
    async fn exec_in_container(
        &self,
        target: &ExecTarget,
        command: &[String],
        deadline: Option<Instant>,
    ) -> Result<BackendOutput, BackendError>;
}
