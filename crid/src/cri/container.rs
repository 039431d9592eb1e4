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

use super::{runtime_backend::ExecTarget, sandbox::SandboxId};
use nix::unistd::Pid;
use proto::cri::ContainerConfig;
use std::fmt::{Display, Formatter};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;
use thiserror::Error;
use tracing::debug;
use validation::{ValidatedField, ValidationError};

/// Opaque identifier of a container.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Wraps an id received from a caller without validating it.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValidatedField<String> for ContainerId {
    fn validate(
        input: Option<String>,
        field_name: &str,
        parent_name: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let input =
            validation::required_not_empty(input, field_name, parent_name)?;

        Ok(Self(input))
    }
}

impl Display for ContainerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Exited,
    Unknown,
}

impl ContainerState {
    /// `Created -> Running -> Exited`, `Created -> Exited`, and any live
    /// state to `Unknown`, which can only resolve to `Exited`.
    pub fn can_transition_to(self, next: ContainerState) -> bool {
        use ContainerState::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Created, Exited)
                | (Running, Exited)
                | (Created | Running, Unknown)
                | (Unknown, Exited)
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("container '{container_id}' is not running")]
    NotRunning { container_id: ContainerId },
    #[error("container '{container_id}' cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        container_id: ContainerId,
        from: ContainerState,
        to: ContainerState,
    },
}

#[derive(Debug)]
struct Lifecycle {
    state: ContainerState,
    started_at: Option<SystemTime>,
    finished_at: Option<SystemTime>,
    pid: Option<Pid>,
}

/// A container inside a sandbox.
///
/// Process creation happens outside this crate. The container records the
/// lifecycle transitions and, while running, the pid whose namespaces exec
/// commands join.
#[derive(Debug)]
pub struct Container {
    id: ContainerId,
    sandbox_id: SandboxId,
    config: ContainerConfig,
    created_at: SystemTime,
    lifecycle: RwLock<Lifecycle>,
}

impl Container {
    pub fn new(
        id: ContainerId,
        sandbox_id: SandboxId,
        config: ContainerConfig,
    ) -> Self {
        Self {
            id,
            sandbox_id,
            config,
            created_at: SystemTime::now(),
            lifecycle: RwLock::new(Lifecycle {
                state: ContainerState::Created,
                started_at: None,
                finished_at: None,
                pid: None,
            }),
        }
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn sandbox_id(&self) -> &SandboxId {
        &self.sandbox_id
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn state(&self) -> ContainerState {
        self.read().state
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.read().started_at
    }

    pub fn finished_at(&self) -> Option<SystemTime> {
        self.read().finished_at
    }

    pub fn pid(&self) -> Option<Pid> {
        self.read().pid
    }

    /// `Created -> Running`. `pid` is the container's init process when one
    /// exists.
    pub fn start(&self, pid: Option<Pid>) -> Result<(), ContainerError> {
        let mut lifecycle = self.write();
        self.check_transition(&lifecycle, ContainerState::Running)?;
        lifecycle.state = ContainerState::Running;
        lifecycle.started_at = Some(SystemTime::now());
        lifecycle.pid = pid;
        debug!(container_id = %self.id, ?pid, "container running");
        Ok(())
    }

    /// Moves the container to `Exited`. Stopping an exited container is a
    /// no-op.
    pub fn stop(&self) -> Result<(), ContainerError> {
        let mut lifecycle = self.write();
        if lifecycle.state == ContainerState::Exited {
            return Ok(());
        }
        self.check_transition(&lifecycle, ContainerState::Exited)?;
        lifecycle.state = ContainerState::Exited;
        lifecycle.finished_at = Some(SystemTime::now());
        lifecycle.pid = None;
        debug!(container_id = %self.id, "container exited");
        Ok(())
    }

    /// The runtime lost track of the container process.
    pub fn mark_unknown(&self) -> Result<(), ContainerError> {
        let mut lifecycle = self.write();
        self.check_transition(&lifecycle, ContainerState::Unknown)?;
        lifecycle.state = ContainerState::Unknown;
        Ok(())
    }

    /// A snapshot of where to exec, or [ContainerError::NotRunning]. The
    /// lifecycle lock is released before this returns.
    pub fn exec_target(&self) -> Result<ExecTarget, ContainerError> {
        let lifecycle = self.read();
        if lifecycle.state != ContainerState::Running {
            return Err(ContainerError::NotRunning {
                container_id: self.id.clone(),
            });
        }
        Ok(ExecTarget { container_id: self.id.clone(), pid: lifecycle.pid })
    }

    fn check_transition(
        &self,
        lifecycle: &Lifecycle,
        to: ContainerState,
    ) -> Result<(), ContainerError> {
        if lifecycle.state.can_transition_to(to) {
            Ok(())
        } else {
            Err(ContainerError::InvalidTransition {
                container_id: self.id.clone(),
                from: lifecycle.state,
                to,
            })
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Lifecycle> {
        self.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Lifecycle> {
        self.lifecycle.write().unwrap_or_else(PoisonError::into_inner)
    }
}
