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

use super::container::{Container, ContainerId};
use super::error::{Result, RuntimeServiceError};
use super::registry::ContainerLookup;
use super::sandbox::SandboxId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type Cache = HashMap<ContainerId, Arc<Container>>;

/// Containers known to the runtime, keyed by id. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct ContainerCache {
    cache: Arc<RwLock<Cache>>,
}

impl ContainerCache {
    pub fn add(&self, container: Arc<Container>) -> Result<Arc<Container>> {
        let mut cache =
            self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.contains_key(container.id()) {
            return Err(RuntimeServiceError::ContainerExists {
                container_id: container.id().clone(),
            });
        }
        let _ = cache.insert(container.id().clone(), container.clone());
        Ok(container)
    }

    pub fn get(&self, container_id: &ContainerId) -> Result<Arc<Container>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        let Some(container) = cache.get(container_id) else {
            return Err(RuntimeServiceError::ContainerNotFound {
                container_id: container_id.clone(),
            });
        };
        Ok(container.clone())
    }

    pub fn list(&self) -> Vec<Arc<Container>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache.values().cloned().collect()
    }

    pub fn list_for_sandbox(
        &self,
        sandbox_id: &SandboxId,
    ) -> Vec<Arc<Container>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache
            .values()
            .filter(|container| container.sandbox_id() == sandbox_id)
            .cloned()
            .collect()
    }

    pub fn remove(
        &self,
        container_id: &ContainerId,
    ) -> Result<Arc<Container>> {
        let mut cache =
            self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let Some(container) = cache.remove(container_id) else {
            return Err(RuntimeServiceError::ContainerNotFound {
                container_id: container_id.clone(),
            });
        };
        Ok(container)
    }
}

impl ContainerLookup for ContainerCache {
    fn lookup_container(
        &self,
        container_id: &ContainerId,
    ) -> Result<Arc<Container>> {
        self.get(container_id)
    }
}
