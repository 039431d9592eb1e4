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

//! Lookup capabilities handed to components that only need to resolve ids.

use super::container::{Container, ContainerId};
use super::error::Result;
use super::sandbox::{Sandbox, SandboxId};
use std::fmt::Debug;
use std::sync::Arc;

/// Resolves sandbox ids. An unknown id fails with a not found error.
pub trait SandboxLookup: Send + Sync + Debug {
    fn lookup_sandbox(&self, sandbox_id: &SandboxId) -> Result<Arc<Sandbox>>;
}

/// Resolves container ids. An unknown id fails with a not found error.
pub trait ContainerLookup: Send + Sync + Debug {
    fn lookup_container(
        &self,
        container_id: &ContainerId,
    ) -> Result<Arc<Container>>;
}
