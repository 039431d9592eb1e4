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
use super::sandbox::SandboxId;
use proto::cri::{
    ContainerConfig, ContainerMetadata, ContainerStatusRequest,
    CreateContainerRequest, ExecSyncRequest, PodSandboxStatusRequest,
    RemoveContainerRequest, RemovePodSandboxRequest, StartContainerRequest,
    StopContainerRequest, StopPodSandboxRequest,
};
use std::collections::HashMap;
use std::time::Duration;
use validation::{ValidatedType, ValidationError};
use validation_macros::ValidatedType;

// --- sandboxes ---

#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedStopPodSandboxRequest {
    #[field_type(String)]
    #[validate]
    pub pod_sandbox_id: SandboxId,
}

impl StopPodSandboxRequestTypeValidator for StopPodSandboxRequestValidator {}

#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedRemovePodSandboxRequest {
    #[field_type(String)]
    #[validate]
    pub pod_sandbox_id: SandboxId,
}

impl RemovePodSandboxRequestTypeValidator
    for RemovePodSandboxRequestValidator
{
}

#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedPodSandboxStatusRequest {
    #[field_type(String)]
    #[validate]
    pub pod_sandbox_id: SandboxId,
}

impl PodSandboxStatusRequestTypeValidator
    for PodSandboxStatusRequestValidator
{
}

// --- containers ---

#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedCreateContainerRequest {
    #[field_type(String)]
    #[validate]
    pub pod_sandbox_id: SandboxId,
    #[field_type(Option<ContainerConfig>)]
    pub config: ValidatedContainerConfig,
}

impl CreateContainerRequestTypeValidator for CreateContainerRequestValidator {
    fn validate_config(
        config: Option<ContainerConfig>,
        field_name: &str,
        parent_name: Option<&str>,
    ) -> Result<ValidatedContainerConfig, ValidationError> {
        let config = validation::required(config, field_name, parent_name)?;

        ValidatedContainerConfig::validate(
            config,
            Some(&*validation::field_name(field_name, parent_name)),
        )
    }
}

#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedContainerConfig {
    #[field_type(Option<ContainerMetadata>)]
    pub metadata: ValidatedContainerMetadata,
    #[validate(none)]
    pub command: Vec<String>,
    #[validate(none)]
    pub args: Vec<String>,
    #[validate(none)]
    pub working_dir: String,
    #[validate(none)]
    pub labels: HashMap<String, String>,
    #[validate(none)]
    pub annotations: HashMap<String, String>,
}

impl ContainerConfigTypeValidator for ContainerConfigValidator {
    fn validate_metadata(
        metadata: Option<ContainerMetadata>,
        field_name: &str,
        parent_name: Option<&str>,
    ) -> Result<ValidatedContainerMetadata, ValidationError> {
        let metadata =
            validation::required(metadata, field_name, parent_name)?;

        ValidatedContainerMetadata::validate(
            metadata,
            Some(&*validation::field_name(field_name, parent_name)),
        )
    }
}

impl From<ValidatedContainerConfig> for ContainerConfig {
    fn from(x: ValidatedContainerConfig) -> Self {
        let ValidatedContainerConfig {
            metadata,
            command,
            args,
            working_dir,
            labels,
            annotations,
        } = x;

        Self {
            metadata: Some(metadata.into()),
            command,
            args,
            working_dir,
            labels,
            annotations,
        }
    }
}

#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedContainerMetadata {
    #[field_type(String)]
    pub name: String,
    #[validate(none)]
    pub attempt: u32,
}

impl ContainerMetadataTypeValidator for ContainerMetadataValidator {
    fn validate_name(
        name: String,
        field_name: &str,
        parent_name: Option<&str>,
    ) -> Result<String, ValidationError> {
        validation::required_not_empty(Some(name), field_name, parent_name)
    }
}

impl From<ValidatedContainerMetadata> for ContainerMetadata {
    fn from(x: ValidatedContainerMetadata) -> Self {
        let ValidatedContainerMetadata { name, attempt } = x;
        Self { name, attempt }
    }
}

#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedStartContainerRequest {
    #[field_type(String)]
    #[validate]
    pub container_id: ContainerId,
}

impl StartContainerRequestTypeValidator for StartContainerRequestValidator {}

#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedStopContainerRequest {
    #[field_type(String)]
    #[validate]
    pub container_id: ContainerId,
}

impl StopContainerRequestTypeValidator for StopContainerRequestValidator {}

#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedRemoveContainerRequest {
    #[field_type(String)]
    #[validate]
    pub container_id: ContainerId,
}

impl RemoveContainerRequestTypeValidator for RemoveContainerRequestValidator {}

#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedContainerStatusRequest {
    #[field_type(String)]
    #[validate]
    pub container_id: ContainerId,
}

impl ContainerStatusRequestTypeValidator for ContainerStatusRequestValidator {}

// --- exec ---

/// Exec requests are checked against the registry before their shape, so
/// nothing here can fail: an empty id must surface as not found and an
/// empty command only matters once the container is known to be running.
#[derive(Debug, Clone, ValidatedType)]
pub(crate) struct ValidatedExecSyncRequest {
    #[field_type(String)]
    pub container_id: ContainerId,
    #[validate(none)]
    pub cmd: Vec<String>,
    #[field_type(i64)]
    pub timeout: Option<Duration>,
}

impl ExecSyncRequestTypeValidator for ExecSyncRequestValidator {
    fn validate_container_id(
        container_id: String,
        _field_name: &str,
        _parent_name: Option<&str>,
    ) -> Result<ContainerId, ValidationError> {
        Ok(ContainerId::new(container_id))
    }

    /// Seconds on the wire. Zero or negative means no deadline.
    fn validate_timeout(
        timeout: i64,
        _field_name: &str,
        _parent_name: Option<&str>,
    ) -> Result<Option<Duration>, ValidationError> {
        Ok(u64::try_from(timeout)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs))
    }
}
