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

use super::error::{Result, RuntimeServiceError};
use super::registry::SandboxLookup;
use super::sandbox::{Sandbox, SandboxId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type Cache = HashMap<SandboxId, Arc<Sandbox>>;

/// Sandboxes known to the runtime, keyed by id. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct SandboxCache {
    cache: Arc<RwLock<Cache>>,
}

impl SandboxCache {
    pub fn add(&self, sandbox: Arc<Sandbox>) -> Result<Arc<Sandbox>> {
        let mut cache =
            self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.contains_key(sandbox.id()) {
            return Err(RuntimeServiceError::SandboxExists {
                sandbox_id: sandbox.id().clone(),
            });
        }
        let _ = cache.insert(sandbox.id().clone(), sandbox.clone());
        Ok(sandbox)
    }

    pub fn get(&self, sandbox_id: &SandboxId) -> Result<Arc<Sandbox>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sandbox) = cache.get(sandbox_id) else {
            return Err(RuntimeServiceError::SandboxNotFound {
                sandbox_id: sandbox_id.clone(),
            });
        };
        Ok(sandbox.clone())
    }

    pub fn list(&self) -> Vec<Arc<Sandbox>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache.values().cloned().collect()
    }

    pub fn remove(&self, sandbox_id: &SandboxId) -> Result<Arc<Sandbox>> {
        let mut cache =
            self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let Some(sandbox) = cache.remove(sandbox_id) else {
            return Err(RuntimeServiceError::SandboxNotFound {
                sandbox_id: sandbox_id.clone(),
            });
        };
        Ok(sandbox)
    }
}

impl SandboxLookup for SandboxCache {
    fn lookup_sandbox(&self, sandbox_id: &SandboxId) -> Result<Arc<Sandbox>> {
        self.get(sandbox_id)
    }
}
