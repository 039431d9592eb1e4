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

use super::runtime_backend::{
    BackendError, BackendOutput, ExecStatus, ExecTarget, RuntimeBackend,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    Complete { stdout: Vec<u8>, stderr: Vec<u8>, exit_code: i32 },
    Fail,
    /// Writes `partial` and runs until the deadline, then reports a timeout.
    Hang { partial: Vec<u8> },
    /// Never returns, deadline or not.
    IgnoreDeadline,
}

/// Scripted [RuntimeBackend] that records how it was called.
#[derive(Debug)]
pub(crate) struct FakeBackend {
    behavior: Behavior,
    calls: AtomicUsize,
    last_call: Mutex<Option<(ExecTarget, Vec<String>)>>,
}

impl FakeBackend {
    pub fn new(behavior: Behavior) -> Self {
        Self { behavior, calls: AtomicUsize::new(0), last_call: Mutex::new(None) }
    }

    pub fn completing(stdout: &str, exit_code: i32) -> Self {
        Self::new(Behavior::Complete {
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
            exit_code,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<(ExecTarget, Vec<String>)> {
        self.last_call.lock().expect("lock").clone()
    }
}

#[tonic::async_trait]
impl RuntimeBackend for FakeBackend {
    async fn exec_in_container(
        &self,
        target: &ExecTarget,
        command: &[String],
        deadline: Option<Instant>,
    ) -> Result<BackendOutput, BackendError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().expect("lock") =
            Some((target.clone(), command.to_vec()));

        match &self.behavior {
            Behavior::Complete { stdout, stderr, exit_code } => Ok(BackendOutput {
                stdout: stdout.clone(),
                stderr: stderr.clone(),
                status: ExecStatus::Exited(*exit_code),
            }),
            Behavior::Fail => Err(BackendError::Spawn {
                program: command.first().cloned().unwrap_or_default(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    "container process is gone",
                ),
            }),
            Behavior::Hang { partial } => {
                let Some(deadline) = deadline else {
                    return std::future::pending().await;
                };
                tokio::time::sleep_until(deadline).await;
                Ok(BackendOutput {
                    stdout: partial.clone(),
                    stderr: Vec::new(),
                    status: ExecStatus::TimedOut,
                })
            }
            Behavior::IgnoreDeadline => std::future::pending().await,
        }
    }
}
