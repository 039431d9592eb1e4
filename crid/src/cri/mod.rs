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

//! The CRI runtime service: sandbox and container registries, their state
//! machines, and synchronous exec.

pub use self::container::{
    Container, ContainerError, ContainerId, ContainerState,
};
pub use self::container_cache::ContainerCache;
pub use self::error::{ErrorKind, RuntimeServiceError};
pub use self::exec_sync::{ExecPhase, ExecResult, ExecSyncService};
pub use self::process_backend::ProcessBackend;
pub use self::registry::{ContainerLookup, SandboxLookup};
pub use self::runtime_backend::{
    BackendError, BackendOutput, ExecStatus, ExecTarget, RuntimeBackend,
};
pub use self::runtime_service::{
    CriRuntimeService, RuntimeService, TIMED_OUT_EXIT_CODE,
};
pub use self::sandbox::{Sandbox, SandboxError, SandboxId, SandboxState};
pub use self::sandbox_cache::SandboxCache;

mod container;
mod container_cache;
mod error;
mod exec_sync;
#[cfg(test)]
mod fake_backend;
mod process_backend;
mod registry;
mod runtime_backend;
mod runtime_service;
mod sandbox;
mod sandbox_cache;
mod validation;
