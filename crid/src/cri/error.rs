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
    container::{ContainerError, ContainerId},
    runtime_backend::BackendError,
    sandbox::{SandboxError, SandboxId},
};
use thiserror::Error;
use tonic::Status;
use tracing::error;
use validation::ValidationError;

pub(crate) type Result<T> = std::result::Result<T, RuntimeServiceError>;

/// Transport independent classification of a [RuntimeServiceError].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was malformed.
    InvalidArgument,
    /// The target already exists or was already configured.
    AlreadySet,
    /// The target does not exist.
    NotFound,
    /// The target exists but is in the wrong state for the operation.
    InvalidState,
    /// The runtime failed while carrying out a valid request.
    Internal,
}

/// Errors returned by the runtime service and its components.
#[derive(Debug, Error)]
pub enum RuntimeServiceError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("sandbox '{sandbox_id}' already exists")]
    SandboxExists { sandbox_id: SandboxId },
    #[error("sandbox '{sandbox_id}' not found")]
    SandboxNotFound { sandbox_id: SandboxId },
    #[error("sandbox '{sandbox_id}' is not ready")]
    SandboxNotReady { sandbox_id: SandboxId },
    #[error("container '{container_id}' already exists")]
    ContainerExists { container_id: ContainerId },
    #[error("no such container {container_id}")]
    ContainerNotFound { container_id: ContainerId },
    #[error("exec command is empty")]
    EmptyCommand,
    #[error("exec in container '{container_id}' failed: {source}")]
    Exec {
        container_id: ContainerId,
        #[source]
        source: BackendError,
    },
}

impl RuntimeServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeServiceError::Sandbox(e) => match e {
                SandboxError::ConfigNil
                | SandboxError::MetadataNil
                | SandboxError::NameEmpty => ErrorKind::InvalidArgument,
                SandboxError::ConfigAlreadySet => ErrorKind::AlreadySet,
                SandboxError::ConfigNotSet { .. }
                | SandboxError::InvalidTransition { .. } => {
                    ErrorKind::InvalidState
                }
            },
            RuntimeServiceError::Container(e) => match e {
                ContainerError::NotRunning { .. }
                | ContainerError::InvalidTransition { .. } => {
                    ErrorKind::InvalidState
                }
            },
            RuntimeServiceError::Validation(_)
            | RuntimeServiceError::EmptyCommand => ErrorKind::InvalidArgument,
            RuntimeServiceError::SandboxExists { .. }
            | RuntimeServiceError::ContainerExists { .. } => {
                ErrorKind::AlreadySet
            }
            RuntimeServiceError::SandboxNotFound { .. }
            | RuntimeServiceError::ContainerNotFound { .. } => {
                ErrorKind::NotFound
            }
            RuntimeServiceError::SandboxNotReady { .. } => {
                ErrorKind::InvalidState
            }
            RuntimeServiceError::Exec { .. } => ErrorKind::Internal,
        }
    }
}

impl From<RuntimeServiceError> for Status {
    fn from(err: RuntimeServiceError) -> Self {
        let msg = err.to_string();
        error!("{msg}");
        match err.kind() {
            ErrorKind::InvalidArgument => Status::invalid_argument(msg),
            ErrorKind::AlreadySet => Status::already_exists(msg),
            ErrorKind::NotFound => Status::not_found(msg),
            ErrorKind::InvalidState => Status::failed_precondition(msg),
            ErrorKind::Internal => Status::internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;
    use tonic::Code;

    #[test_case(SandboxError::ConfigNil.into(), Code::InvalidArgument; "nil config")]
    #[test_case(SandboxError::ConfigAlreadySet.into(), Code::AlreadyExists; "config already set")]
    #[test_case(RuntimeServiceError::ContainerNotFound { container_id: ContainerId::new("c1") }, Code::NotFound; "unknown container")]
    #[test_case(ContainerError::NotRunning { container_id: ContainerId::new("c1") }.into(), Code::FailedPrecondition; "stopped container")]
    #[test_case(RuntimeServiceError::EmptyCommand, Code::InvalidArgument; "empty command")]
    #[test]
    fn maps_to_grpc_code(err: RuntimeServiceError, expected: Code) {
        assert_eq!(Status::from(err).code(), expected);
    }

    #[test]
    fn backend_failure_is_internal_and_names_container() {
        let err = RuntimeServiceError::Exec {
            container_id: ContainerId::new("c1"),
            source: BackendError::EmptyCommand,
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().starts_with("exec in container 'c1' failed: "));
    }

    #[test]
    fn not_found_message_names_container() {
        let err = RuntimeServiceError::ContainerNotFound {
            container_id: ContainerId::new("c9"),
        };
        assert_eq!(err.to_string(), "no such container c9");
    }
}
