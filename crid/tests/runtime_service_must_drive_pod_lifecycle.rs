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

use common::{cmd, PodSandboxConfigBuilder};
use crid::cri::{
    ContainerState, CriRuntimeService, ProcessBackend, RuntimeService,
};
use crid::RuntimeConfig;
use pretty_assertions::assert_eq;
use proto::cri::{
    ContainerConfig, ContainerMetadata, CreateContainerRequest,
    ExecSyncRequest, PodSandboxState, PodSandboxStatusRequest,
    RemovePodSandboxRequest, RunPodSandboxRequest, StartContainerRequest,
    StopPodSandboxRequest,
};
use std::sync::Arc;
use tonic::{Code, Request};

mod common;

fn echo_hi(container_id: &str) -> Request<ExecSyncRequest> {
    Request::new(ExecSyncRequest {
        container_id: container_id.to_string(),
        cmd: cmd(&["echo", "hi"]),
        timeout: 5,
    })
}

#[tokio::test]
async fn runtime_service_must_drive_pod_lifecycle() {
    let mut config = RuntimeConfig::default();
    config.exec.host_exec = true;
    let service = RuntimeService::new(
        Arc::new(ProcessBackend::new(&config.exec)),
        &config,
    );

    let pod_sandbox_id = CriRuntimeService::run_pod_sandbox(
        &service,
        Request::new(RunPodSandboxRequest {
            config: Some(PodSandboxConfigBuilder::new().name("pod-a").build()),
            runtime_handler: String::new(),
        }),
    )
    .await
    .expect("run sandbox")
    .into_inner()
    .pod_sandbox_id;

    let container_id = CriRuntimeService::create_container(
        &service,
        Request::new(CreateContainerRequest {
            pod_sandbox_id: pod_sandbox_id.clone(),
            config: Some(ContainerConfig {
                metadata: Some(ContainerMetadata {
                    name: "c1".into(),
                    attempt: 0,
                }),
                ..Default::default()
            }),
            sandbox_config: None,
        }),
    )
    .await
    .expect("create container")
    .into_inner()
    .container_id;

    let _ = CriRuntimeService::start_container(
        &service,
        Request::new(StartContainerRequest {
            container_id: container_id.clone(),
        }),
    )
    .await
    .expect("start container");

    let response = CriRuntimeService::exec_sync(&service, echo_hi(&container_id))
        .await
        .expect("exec")
        .into_inner();
    assert_eq!(response.stdout, b"hi\n".to_vec());
    assert_eq!(response.exit_code, 0);

    let _ = CriRuntimeService::stop_pod_sandbox(
        &service,
        Request::new(StopPodSandboxRequest {
            pod_sandbox_id: pod_sandbox_id.clone(),
        }),
    )
    .await
    .expect("stop sandbox");

    let status = CriRuntimeService::pod_sandbox_status(
        &service,
        Request::new(PodSandboxStatusRequest {
            pod_sandbox_id: pod_sandbox_id.clone(),
            verbose: false,
        }),
    )
    .await
    .expect("sandbox status")
    .into_inner()
    .status
    .expect("status set");
    assert_eq!(status.state, PodSandboxState::SandboxNotready as i32);

    let container = service
        .containers()
        .list()
        .into_iter()
        .find(|c| c.id().as_str() == container_id)
        .expect("container registered");
    assert_eq!(container.state(), ContainerState::Exited);

    let err = CriRuntimeService::exec_sync(&service, echo_hi(&container_id))
        .await
        .expect_err("exec in stopped container");
    assert_eq!(err.code(), Code::FailedPrecondition);

    let _ = CriRuntimeService::remove_pod_sandbox(
        &service,
        Request::new(RemovePodSandboxRequest { pod_sandbox_id }),
    )
    .await
    .expect("remove sandbox");

    let err = CriRuntimeService::exec_sync(&service, echo_hi(&container_id))
        .await
        .expect_err("exec in removed container");
    assert_eq!(err.code(), Code::NotFound);
}
