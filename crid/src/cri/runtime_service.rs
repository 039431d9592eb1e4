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

use super::{
    container::{Container, ContainerId, ContainerState},
    container_cache::ContainerCache,
    error::{Result, RuntimeServiceError},
    exec_sync::ExecSyncService,
    registry::{ContainerLookup, SandboxLookup},
    runtime_backend::RuntimeBackend,
    sandbox::{Sandbox, SandboxId, SandboxState},
    sandbox_cache::SandboxCache,
    validation::{
        ValidatedContainerStatusRequest, ValidatedCreateContainerRequest,
        ValidatedExecSyncRequest, ValidatedPodSandboxStatusRequest,
        ValidatedRemoveContainerRequest, ValidatedRemovePodSandboxRequest,
        ValidatedStartContainerRequest, ValidatedStopContainerRequest,
        ValidatedStopPodSandboxRequest,
    },
};
use crate::config::RuntimeConfig;
use ::validation::ValidatedType;
use proto::cri::{
    self, ContainerStatus, ContainerStatusRequest, ContainerStatusResponse,
    CreateContainerRequest, CreateContainerResponse, ExecSyncRequest,
    ExecSyncResponse, PodSandboxState, PodSandboxStatus,
    PodSandboxStatusRequest, PodSandboxStatusResponse, RemoveContainerRequest,
    RemoveContainerResponse, RemovePodSandboxRequest,
    RemovePodSandboxResponse, RunPodSandboxRequest, RunPodSandboxResponse,
    StartContainerRequest, StartContainerResponse, StopContainerRequest,
    StopContainerResponse, StopPodSandboxRequest, StopPodSandboxResponse,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tonic::{Request, Response, Status};
use tracing::{info, warn};

/// Exit code reported on the wire for an exec that hit its deadline.
pub const TIMED_OUT_EXIT_CODE: i32 = -1;

/// The CRI `RuntimeService` calls served by crid, in the shape of the tonic
/// generated server trait.
#[tonic::async_trait]
pub trait CriRuntimeService: Send + Sync + 'static {
    async fn run_pod_sandbox(
        &self,
        request: Request<RunPodSandboxRequest>,
    ) -> std::result::Result<Response<RunPodSandboxResponse>, Status>;

    async fn stop_pod_sandbox(
        &self,
        request: Request<StopPodSandboxRequest>,
    ) -> std::result::Result<Response<StopPodSandboxResponse>, Status>;

    async fn remove_pod_sandbox(
        &self,
        request: Request<RemovePodSandboxRequest>,
    ) -> std::result::Result<Response<RemovePodSandboxResponse>, Status>;

    async fn pod_sandbox_status(
        &self,
        request: Request<PodSandboxStatusRequest>,
    ) -> std::result::Result<Response<PodSandboxStatusResponse>, Status>;

    async fn create_container(
        &self,
        request: Request<CreateContainerRequest>,
    ) -> std::result::Result<Response<CreateContainerResponse>, Status>;

    async fn start_container(
        &self,
        request: Request<StartContainerRequest>,
    ) -> std::result::Result<Response<StartContainerResponse>, Status>;

    async fn stop_container(
        &self,
        request: Request<StopContainerRequest>,
    ) -> std::result::Result<Response<StopContainerResponse>, Status>;

    async fn remove_container(
        &self,
        request: Request<RemoveContainerRequest>,
    ) -> std::result::Result<Response<RemoveContainerResponse>, Status>;

    async fn container_status(
        &self,
        request: Request<ContainerStatusRequest>,
    ) -> std::result::Result<Response<ContainerStatusResponse>, Status>;

    async fn exec_sync(
        &self,
        request: Request<ExecSyncRequest>,
    ) -> std::result::Result<Response<ExecSyncResponse>, Status>;
}

/// Owns the sandbox and container registries and routes CRI calls to them.
#[derive(Debug, Clone)]
pub struct RuntimeService {
    sandboxes: SandboxCache,
    containers: ContainerCache,
    exec: ExecSyncService,
}

impl RuntimeService {
    pub fn new(backend: Arc<dyn RuntimeBackend>, config: &RuntimeConfig) -> Self {
        let sandboxes = SandboxCache::default();
        let containers = ContainerCache::default();
        let exec = ExecSyncService::new(
            Arc::new(containers.clone()),
            backend,
            &config.exec,
        );
        Self { sandboxes, containers, exec }
    }

    pub fn sandboxes(&self) -> &SandboxCache {
        &self.sandboxes
    }

    pub fn containers(&self) -> &ContainerCache {
        &self.containers
    }

    #[tracing::instrument(skip(self, config))]
    async fn run_pod_sandbox(
        &self,
        config: Option<cri::PodSandboxConfig>,
        runtime_handler: String,
    ) -> Result<RunPodSandboxResponse> {
        let sandbox =
            Arc::new(Sandbox::new(SandboxId::generate(), runtime_handler));
        sandbox.set_config(config)?;
        let sandbox = self.sandboxes.add(sandbox)?;

        // networking and the pause process live outside crid, so the sandbox
        // is ready as soon as it is registered
        sandbox.mark_ready()?;
        info!(sandbox_id = %sandbox.id(), name = ?sandbox.name(), "sandbox ready");

        Ok(RunPodSandboxResponse { pod_sandbox_id: sandbox.id().to_string() })
    }

    #[tracing::instrument(skip(self))]
    async fn stop_pod_sandbox(
        &self,
        request: ValidatedStopPodSandboxRequest,
    ) -> Result<StopPodSandboxResponse> {
        let ValidatedStopPodSandboxRequest { pod_sandbox_id } = request;
        let sandbox = self.sandboxes.lookup_sandbox(&pod_sandbox_id)?;

        // not ready first, so a concurrent create either sees it or is listed
        sandbox.mark_not_ready();
        for container in self.containers.list_for_sandbox(&pod_sandbox_id) {
            container.stop()?;
        }

        Ok(StopPodSandboxResponse {})
    }

    /// Removing an unknown sandbox succeeds.
    #[tracing::instrument(skip(self))]
    async fn remove_pod_sandbox(
        &self,
        request: ValidatedRemovePodSandboxRequest,
    ) -> Result<RemovePodSandboxResponse> {
        let ValidatedRemovePodSandboxRequest { pod_sandbox_id } = request;
        let sandbox = match self.sandboxes.lookup_sandbox(&pod_sandbox_id) {
            Ok(sandbox) => sandbox,
            Err(RuntimeServiceError::SandboxNotFound { .. }) => {
                return Ok(RemovePodSandboxResponse {})
            }
            Err(e) => return Err(e),
        };

        sandbox.mark_not_ready();
        for container in self.containers.list_for_sandbox(&pod_sandbox_id) {
            self.remove_sandbox_container(&container)?;
        }
        let _ = self.sandboxes.remove(&pod_sandbox_id)?;
        info!(%pod_sandbox_id, "sandbox removed");

        Ok(RemovePodSandboxResponse {})
    }

    /// Stops and deregisters a container of a sandbox being removed. A
    /// container already removed by a concurrent call is not an error.
    fn remove_sandbox_container(&self, container: &Container) -> Result<()> {
        container.stop()?;
        match self.containers.remove(container.id()) {
            Ok(_) | Err(RuntimeServiceError::ContainerNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn pod_sandbox_status(
        &self,
        request: ValidatedPodSandboxStatusRequest,
    ) -> Result<PodSandboxStatusResponse> {
        let ValidatedPodSandboxStatusRequest { pod_sandbox_id } = request;
        let sandbox = self.sandboxes.lookup_sandbox(&pod_sandbox_id)?;

        Ok(PodSandboxStatusResponse {
            status: Some(sandbox_status(&sandbox)),
            info: Default::default(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn create_container(
        &self,
        request: ValidatedCreateContainerRequest,
    ) -> Result<CreateContainerResponse> {
        let ValidatedCreateContainerRequest { pod_sandbox_id, config } = request;
        let sandbox = self.sandboxes.lookup_sandbox(&pod_sandbox_id)?;
        if sandbox.state() != SandboxState::Ready {
            return Err(RuntimeServiceError::SandboxNotReady {
                sandbox_id: pod_sandbox_id,
            });
        }

        let container = self.containers.add(Arc::new(Container::new(
            ContainerId::generate(),
            pod_sandbox_id,
            config.into(),
        )))?;
        self.ensure_still_ready(&sandbox, &container)?;
        info!(container_id = %container.id(), sandbox_id = %container.sandbox_id(), "container created");

        Ok(CreateContainerResponse { container_id: container.id().to_string() })
    }

    /// Rolls back a container added while its sandbox was being stopped or
    /// removed. Stop and remove mark the sandbox not ready before listing
    /// its containers, so a container that passes this check is always seen
    /// by them.
    fn ensure_still_ready(
        &self,
        sandbox: &Sandbox,
        container: &Container,
    ) -> Result<()> {
        if sandbox.state() == SandboxState::Ready {
            return Ok(());
        }
        let _ = self.containers.remove(container.id());
        Err(RuntimeServiceError::SandboxNotReady {
            sandbox_id: sandbox.id().clone(),
        })
    }

    /// Process creation happens outside crid; this records the transition.
    #[tracing::instrument(skip(self))]
    async fn start_container(
        &self,
        request: ValidatedStartContainerRequest,
    ) -> Result<StartContainerResponse> {
        let ValidatedStartContainerRequest { container_id } = request;
        let container = self.containers.lookup_container(&container_id)?;
        container.start(None)?;
        Ok(StartContainerResponse {})
    }

    #[tracing::instrument(skip(self))]
    async fn stop_container(
        &self,
        request: ValidatedStopContainerRequest,
    ) -> Result<StopContainerResponse> {
        let ValidatedStopContainerRequest { container_id } = request;
        let container = self.containers.lookup_container(&container_id)?;
        container.stop()?;
        Ok(StopContainerResponse {})
    }

    /// Removing an unknown container succeeds.
    #[tracing::instrument(skip(self))]
    async fn remove_container(
        &self,
        request: ValidatedRemoveContainerRequest,
    ) -> Result<RemoveContainerResponse> {
        let ValidatedRemoveContainerRequest { container_id } = request;
        match self.containers.remove(&container_id) {
            Ok(container) => {
                if let Err(e) = container.stop() {
                    warn!(%container_id, "removed container did not stop cleanly: {e}");
                }
                Ok(RemoveContainerResponse {})
            }
            Err(RuntimeServiceError::ContainerNotFound { .. }) => {
                Ok(RemoveContainerResponse {})
            }
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn container_status(
        &self,
        request: ValidatedContainerStatusRequest,
    ) -> Result<ContainerStatusResponse> {
        let ValidatedContainerStatusRequest { container_id } = request;
        let container = self.containers.lookup_container(&container_id)?;

        Ok(ContainerStatusResponse {
            status: Some(container_status(&container)),
            info: Default::default(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn exec_sync(
        &self,
        request: ValidatedExecSyncRequest,
    ) -> Result<ExecSyncResponse> {
        let ValidatedExecSyncRequest { container_id, cmd, timeout } = request;
        let result = self.exec.exec_sync(&container_id, cmd, timeout).await?;

        Ok(ExecSyncResponse {
            exit_code: result.exit_code().unwrap_or(TIMED_OUT_EXIT_CODE),
            stdout: result.stdout,
            stderr: result.stderr,
        })
    }
}

#[tonic::async_trait]
impl CriRuntimeService for RuntimeService {
    async fn run_pod_sandbox(
        &self,
        request: Request<RunPodSandboxRequest>,
    ) -> std::result::Result<Response<RunPodSandboxResponse>, Status> {
        let RunPodSandboxRequest { config, runtime_handler } =
            request.into_inner();
        Ok(Response::new(self.run_pod_sandbox(config, runtime_handler).await?))
    }

    async fn stop_pod_sandbox(
        &self,
        request: Request<StopPodSandboxRequest>,
    ) -> std::result::Result<Response<StopPodSandboxResponse>, Status> {
        let request =
            ValidatedStopPodSandboxRequest::validate(request.into_inner(), None)
                .map_err(RuntimeServiceError::from)?;
        Ok(Response::new(self.stop_pod_sandbox(request).await?))
    }

    async fn remove_pod_sandbox(
        &self,
        request: Request<RemovePodSandboxRequest>,
    ) -> std::result::Result<Response<RemovePodSandboxResponse>, Status> {
        let request = ValidatedRemovePodSandboxRequest::validate(
            request.into_inner(),
            None,
        )
        .map_err(RuntimeServiceError::from)?;
        Ok(Response::new(self.remove_pod_sandbox(request).await?))
    }

    async fn pod_sandbox_status(
        &self,
        request: Request<PodSandboxStatusRequest>,
    ) -> std::result::Result<Response<PodSandboxStatusResponse>, Status> {
        let request = ValidatedPodSandboxStatusRequest::validate(
            request.into_inner(),
            None,
        )
        .map_err(RuntimeServiceError::from)?;
        Ok(Response::new(self.pod_sandbox_status(request).await?))
    }

    async fn create_container(
        &self,
        request: Request<CreateContainerRequest>,
    ) -> std::result::Result<Response<CreateContainerResponse>, Status> {
        let request = ValidatedCreateContainerRequest::validate(
            request.into_inner(),
            None,
        )
        .map_err(RuntimeServiceError::from)?;
        Ok(Response::new(self.create_container(request).await?))
    }

    async fn start_container(
        &self,
        request: Request<StartContainerRequest>,
    ) -> std::result::Result<Response<StartContainerResponse>, Status> {
        let request =
            ValidatedStartContainerRequest::validate(request.into_inner(), None)
                .map_err(RuntimeServiceError::from)?;
        Ok(Response::new(self.start_container(request).await?))
    }

    async fn stop_container(
        &self,
        request: Request<StopContainerRequest>,
    ) -> std::result::Result<Response<StopContainerResponse>, Status> {
        let request =
            ValidatedStopContainerRequest::validate(request.into_inner(), None)
                .map_err(RuntimeServiceError::from)?;
        Ok(Response::new(self.stop_container(request).await?))
    }

    async fn remove_container(
        &self,
        request: Request<RemoveContainerRequest>,
    ) -> std::result::Result<Response<RemoveContainerResponse>, Status> {
        let request = ValidatedRemoveContainerRequest::validate(
            request.into_inner(),
            None,
        )
        .map_err(RuntimeServiceError::from)?;
        Ok(Response::new(self.remove_container(request).await?))
    }

    async fn container_status(
        &self,
        request: Request<ContainerStatusRequest>,
    ) -> std::result::Result<Response<ContainerStatusResponse>, Status> {
        let request = ValidatedContainerStatusRequest::validate(
            request.into_inner(),
            None,
        )
        .map_err(RuntimeServiceError::from)?;
        Ok(Response::new(self.container_status(request).await?))
    }

    async fn exec_sync(
        &self,
        request: Request<ExecSyncRequest>,
    ) -> std::result::Result<Response<ExecSyncResponse>, Status> {
        let request =
            ValidatedExecSyncRequest::validate(request.into_inner(), None)
                .map_err(RuntimeServiceError::from)?;
        Ok(Response::new(self.exec_sync(request).await?))
    }
}

fn sandbox_status(sandbox: &Sandbox) -> PodSandboxStatus {
    let config = sandbox.config();
    let state = match sandbox.state() {
        SandboxState::Ready => PodSandboxState::SandboxReady,
        SandboxState::Configuring | SandboxState::NotReady => {
            PodSandboxState::SandboxNotready
        }
    };

    PodSandboxStatus {
        id: sandbox.id().to_string(),
        metadata: config.and_then(|config| config.metadata.clone()),
        state: state.into(),
        created_at: unix_nanos(Some(sandbox.created_at())),
        labels: config.map(|config| config.labels.clone()).unwrap_or_default(),
        annotations: config
            .map(|config| config.annotations.clone())
            .unwrap_or_default(),
        runtime_handler: sandbox.runtime_handler().to_string(),
    }
}

fn container_status(container: &Container) -> ContainerStatus {
    let config = container.config();
    let state = match container.state() {
        ContainerState::Created => cri::ContainerState::ContainerCreated,
        ContainerState::Running => cri::ContainerState::ContainerRunning,
        ContainerState::Exited => cri::ContainerState::ContainerExited,
        ContainerState::Unknown => cri::ContainerState::ContainerUnknown,
    };

    ContainerStatus {
        id: container.id().to_string(),
        metadata: config.metadata.clone(),
        state: state.into(),
        created_at: unix_nanos(Some(container.created_at())),
        started_at: unix_nanos(container.started_at()),
        finished_at: unix_nanos(container.finished_at()),
        exit_code: 0,
        labels: config.labels.clone(),
        annotations: config.annotations.clone(),
    }
}

/// Nanoseconds since the epoch, zero when unset.
fn unix_nanos(time: Option<SystemTime>) -> i64 {
    time.and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|since| i64::try_from(since.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
