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

#![allow(dead_code)]

use crid::cri::{Container, ContainerCache, ContainerId, SandboxId};
use proto::cri::{ContainerConfig, PodSandboxConfig, PodSandboxMetadata};
use std::sync::Arc;

pub struct PodSandboxConfigBuilder {
    name: String,
    namespace: String,
}

impl PodSandboxConfigBuilder {
    pub fn new() -> Self {
        Self {
            name: format!("pod-{}", uuid::Uuid::new_v4().simple()),
            namespace: "default".into(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> PodSandboxConfig {
        PodSandboxConfig {
            metadata: Some(PodSandboxMetadata {
                name: self.name,
                uid: uuid::Uuid::new_v4().to_string(),
                namespace: self.namespace,
                attempt: 0,
            }),
            ..Default::default()
        }
    }
}

/// Registers a running container with no namespace pid, so exec commands
/// run directly on the host.
pub fn running_container(containers: &ContainerCache, id: &str) -> Arc<Container> {
    let container = containers
        .add(Arc::new(Container::new(
            ContainerId::new(id),
            SandboxId::new("pod-a"),
            ContainerConfig::default(),
        )))
        .expect("add container");
    container.start(None).expect("start container");
    container
}

pub fn cmd(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
