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

//! Synchronous exec: run a command in a running container and collect its
//! output, bounded by an optional deadline.

use super::container::ContainerId;
use super::error::{Result, RuntimeServiceError};
use super::registry::ContainerLookup;
use super::runtime_backend::{BackendOutput, ExecStatus, RuntimeBackend};
use crate::config::ExecConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Progress of a single exec. `Completed`, `TimedOut` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecPhase {
    Pending,
    Running,
    Completed,
    TimedOut,
    Failed,
}

impl ExecPhase {
    pub fn can_transition_to(self, next: ExecPhase) -> bool {
        use ExecPhase::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Completed)
                | (Running, TimedOut)
                | (Running, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecPhase::Completed | ExecPhase::TimedOut | ExecPhase::Failed
        )
    }
}

/// Outcome of an exec that reached the backend. A timeout is a result, not
/// an error: the output captured before the kill is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: ExecStatus,
}

impl ExecResult {
    pub fn exit_code(&self) -> Option<i32> {
        self.status.exit_code()
    }

    pub fn timed_out(&self) -> bool {
        self.status.timed_out()
    }
}

impl From<BackendOutput> for ExecResult {
    fn from(output: BackendOutput) -> Self {
        let BackendOutput { stdout, stderr, status } = output;
        Self { stdout, stderr, status }
    }
}

#[derive(Debug)]
struct ExecSession<'a> {
    container_id: &'a ContainerId,
    phase: ExecPhase,
}

impl<'a> ExecSession<'a> {
    fn new(container_id: &'a ContainerId) -> Self {
        Self { container_id, phase: ExecPhase::Pending }
    }

    fn advance(&mut self, next: ExecPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "exec phase {:?} -> {next:?}",
            self.phase
        );
        debug!(container_id = %self.container_id, from = ?self.phase, to = ?next, "exec phase");
        self.phase = next;
    }
}

/// Validates exec requests against the container registry and hands them
/// to a [RuntimeBackend].
#[derive(Debug, Clone)]
pub struct ExecSyncService {
    containers: Arc<dyn ContainerLookup>,
    backend: Arc<dyn RuntimeBackend>,
    backend_grace: Duration,
}

impl ExecSyncService {
    pub fn new(
        containers: Arc<dyn ContainerLookup>,
        backend: Arc<dyn RuntimeBackend>,
        config: &ExecConfig,
    ) -> Self {
        Self { containers, backend, backend_grace: config.backend_grace() }
    }

    /// Runs `command` in the container and waits for it.
    ///
    /// Checks run in order and the first failure wins: the container must
    /// exist, be running, and the command must be non-empty. None of these
    /// failures reach the backend.
    ///
    /// A `timeout` of `None` or zero means no deadline, and so does one too
    /// large to represent as an instant.
    ///
    /// A backend still running `backend_grace` past the deadline is
    /// abandoned. Its output never reached this service, so the timed out
    /// result carries empty stdout and stderr. [ProcessBackend] always
    /// returns at the deadline and keeps its partial output.
    ///
    /// [ProcessBackend]: super::ProcessBackend
    #[tracing::instrument(skip(self))]
    pub async fn exec_sync(
        &self,
        container_id: &ContainerId,
        command: Vec<String>,
        timeout: Option<Duration>,
    ) -> Result<ExecResult> {
        let container = self.containers.lookup_container(container_id)?;
        let target = container.exec_target()?;
        if command.is_empty() {
            return Err(RuntimeServiceError::EmptyCommand);
        }

        let mut session = ExecSession::new(container_id);
        // a deadline past the clock's range is no deadline
        let deadline = timeout
            .filter(|timeout| !timeout.is_zero())
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let abandon_at =
            deadline.and_then(|deadline| deadline.checked_add(self.backend_grace));

        session.advance(ExecPhase::Running);
        let invocation =
            self.backend.exec_in_container(&target, &command, deadline);
        let outcome = match abandon_at {
            None => invocation.await,
            Some(abandon_at) => {
                match tokio::time::timeout_at(abandon_at, invocation).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(%container_id, "backend overran the exec deadline, abandoning it");
                        Ok(BackendOutput {
                            stdout: Vec::new(),
                            stderr: Vec::new(),
                            status: ExecStatus::TimedOut,
                        })
                    }
                }
            }
        };

        match outcome {
            Ok(output) => {
                session.advance(if output.status.timed_out() {
                    ExecPhase::TimedOut
                } else {
                    ExecPhase::Completed
                });
                Ok(output.into())
            }
            Err(source) => {
                session.advance(ExecPhase::Failed);
                Err(RuntimeServiceError::Exec {
                    container_id: container_id.clone(),
                    source,
                })
            }
        }
    }
}
