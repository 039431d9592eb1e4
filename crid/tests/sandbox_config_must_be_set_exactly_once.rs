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

use common::PodSandboxConfigBuilder;
use crid::cri::{ErrorKind, RuntimeServiceError, Sandbox, SandboxError, SandboxId};
use pretty_assertions::assert_eq;
use std::sync::Arc;

mod common;

#[test]
fn sandbox_config_must_be_set_exactly_once() {
    let sandbox = Sandbox::new(SandboxId::generate(), "");

    sandbox
        .set_config(Some(PodSandboxConfigBuilder::new().name("pod-a").build()))
        .expect("first set_config");
    assert_eq!(sandbox.name(), Some("pod-a"));

    let err = sandbox
        .set_config(Some(PodSandboxConfigBuilder::new().name("pod-b").build()))
        .expect_err("second set_config");
    assert_eq!(err, SandboxError::ConfigAlreadySet);
    assert_eq!(RuntimeServiceError::from(err).kind(), ErrorKind::AlreadySet);
    assert_eq!(sandbox.name(), Some("pod-a"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sandbox_config_must_have_one_winner_across_tasks() {
    let sandbox = Arc::new(Sandbox::new(SandboxId::generate(), ""));

    let attempts = (0..32).map(|_| {
        let sandbox = sandbox.clone();
        tokio::spawn(async move {
            sandbox.set_config(Some(PodSandboxConfigBuilder::new().build()))
        })
    });
    let results = futures::future::join_all(attempts).await;

    let wins = results
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .filter(Result::is_ok)
        .count();
    assert_eq!(wins, 1);
    assert!(sandbox.config().is_some());
}
