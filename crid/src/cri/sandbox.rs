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

use proto::cri::PodSandboxConfig;
use std::fmt::{Display, Formatter};
use std::sync::{OnceLock, PoisonError, RwLock};
use std::time::SystemTime;
use thiserror::Error;
use tracing::debug;
use validation::{ValidatedField, ValidationError};

/// Opaque identifier of a pod sandbox.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct SandboxId(String);

impl SandboxId {
    /// A fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Wraps an id received from a caller without validating it. Use this
    /// for lookups, where an unknown id must surface as not found.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValidatedField<String> for SandboxId {
    fn validate(
        input: Option<String>,
        field_name: &str,
        parent_name: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let input =
            validation::required_not_empty(input, field_name, parent_name)?;

        Ok(Self(input))
    }
}

impl Display for SandboxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a sandbox. `Configuring` until the runtime marks it ready;
/// `NotReady` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Configuring,
    Ready,
    NotReady,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SandboxError {
    #[error("config is nil")]
    ConfigNil,
    #[error("metadata is nil")]
    MetadataNil,
    #[error("name is empty")]
    NameEmpty,
    #[error("config already set")]
    ConfigAlreadySet,
    #[error("sandbox '{sandbox_id}' cannot become ready without a config")]
    ConfigNotSet { sandbox_id: SandboxId },
    #[error("sandbox '{sandbox_id}' cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        sandbox_id: SandboxId,
        from: SandboxState,
        to: SandboxState,
    },
}

/// A pod sandbox: the shared environment its containers run in.
///
/// The config is write-once. Concurrent [Sandbox::set_config] calls race on
/// a single slot and exactly one of them can win.
#[derive(Debug)]
pub struct Sandbox {
    id: SandboxId,
    runtime_handler: String,
    created_at: SystemTime,
    config: OnceLock<PodSandboxConfig>,
    state: RwLock<SandboxState>,
}

impl Sandbox {
    pub fn new(id: SandboxId, runtime_handler: impl Into<String>) -> Self {
        Self {
            id,
            runtime_handler: runtime_handler.into(),
            created_at: SystemTime::now(),
            config: OnceLock::new(),
            state: RwLock::new(SandboxState::Configuring),
        }
    }

    pub fn id(&self) -> &SandboxId {
        &self.id
    }

    pub fn runtime_handler(&self) -> &str {
        &self.runtime_handler
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Records the sandbox config.
    ///
    /// Checks run in order and the first failure wins: the config must be
    /// present, carry metadata, and carry a non-empty name. Only then is the
    /// config stored, which fails if one is already set. A failed call never
    /// changes the stored config.
    pub fn set_config(
        &self,
        config: Option<PodSandboxConfig>,
    ) -> Result<(), SandboxError> {
        let config = validate_config(config)?;
        self.config.set(config).map_err(|_| SandboxError::ConfigAlreadySet)?;
        debug!(sandbox_id = %self.id, "sandbox config set");
        Ok(())
    }

    /// The stored config, if [Sandbox::set_config] has succeeded.
    pub fn config(&self) -> Option<&PodSandboxConfig> {
        self.config.get()
    }

    /// The metadata name from the stored config.
    pub fn name(&self) -> Option<&str> {
        self.config()
            .and_then(|config| config.metadata.as_ref())
            .map(|metadata| metadata.name.as_str())
    }

    pub fn state(&self) -> SandboxState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// `Configuring -> Ready`. Requires a stored config.
    pub fn mark_ready(&self) -> Result<(), SandboxError> {
        let mut state =
            self.state.write().unwrap_or_else(PoisonError::into_inner);

        if *state != SandboxState::Configuring {
            return Err(SandboxError::InvalidTransition {
                sandbox_id: self.id.clone(),
                from: *state,
                to: SandboxState::Ready,
            });
        }

        if self.config.get().is_none() {
            return Err(SandboxError::ConfigNotSet {
                sandbox_id: self.id.clone(),
            });
        }

        *state = SandboxState::Ready;
        Ok(())
    }

    /// Moves the sandbox to its terminal state. Repeating it is a no-op.
    pub fn mark_not_ready(&self) {
        let mut state =
            self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state != SandboxState::NotReady {
            debug!(sandbox_id = %self.id, from = ?*state, "sandbox not ready");
            *state = SandboxState::NotReady;
        }
    }
}

fn validate_config(
    config: Option<PodSandboxConfig>,
) -> Result<PodSandboxConfig, SandboxError> {
    let Some(config) = config else {
        return Err(SandboxError::ConfigNil);
    };
    let Some(metadata) = &config.metadata else {
        return Err(SandboxError::MetadataNil);
    };
    if metadata.name.is_empty() {
        return Err(SandboxError::NameEmpty);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::cri::PodSandboxMetadata;
    use simple_test_case::test_case;
    use std::sync::{Arc, Barrier};

    fn config_named(name: &str) -> PodSandboxConfig {
        PodSandboxConfig {
            metadata: Some(PodSandboxMetadata {
                name: name.to_string(),
                uid: "uid".to_string(),
                namespace: "default".to_string(),
                attempt: 0,
            }),
            ..Default::default()
        }
    }

    fn sandbox() -> Sandbox {
        Sandbox::new(SandboxId::new("sandbox"), "")
    }

    #[test]
    fn set_config_stores_config() {
        let sandbox = sandbox();
        sandbox.set_config(Some(config_named("name"))).expect("set config");
        assert_eq!(sandbox.config(), Some(&config_named("name")));
        assert_eq!(sandbox.name(), Some("name"));
    }

    #[test_case(None, SandboxError::ConfigNil; "nil config")]
    #[test_case(Some(PodSandboxConfig::default()), SandboxError::MetadataNil; "empty config")]
    #[test_case(Some(config_named("")), SandboxError::NameEmpty; "empty name")]
    #[test]
    fn set_config_rejects_invalid_config(
        config: Option<PodSandboxConfig>,
        expected: SandboxError,
    ) {
        let sandbox = sandbox();
        assert_eq!(sandbox.set_config(config), Err(expected));
        assert_eq!(sandbox.config(), None);
    }

    #[test]
    fn set_config_fails_when_already_set() {
        let sandbox = sandbox();
        sandbox.set_config(Some(config_named("name"))).expect("set config");

        assert_eq!(
            sandbox.set_config(Some(config_named("name"))),
            Err(SandboxError::ConfigAlreadySet)
        );
        assert_eq!(
            sandbox.set_config(Some(config_named("other"))),
            Err(SandboxError::ConfigAlreadySet)
        );
        assert_eq!(sandbox.config(), Some(&config_named("name")));
    }

    #[test]
    fn invalid_config_is_reported_before_already_set() {
        let sandbox = sandbox();
        sandbox.set_config(Some(config_named("name"))).expect("set config");

        assert_eq!(sandbox.set_config(None), Err(SandboxError::ConfigNil));
        assert_eq!(sandbox.config(), Some(&config_named("name")));
    }

    #[test]
    fn concurrent_set_config_has_one_winner() {
        const CALLERS: usize = 16;
        let sandbox = sandbox();
        let barrier = Barrier::new(CALLERS);

        let results: Vec<(String, Result<(), SandboxError>)> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = (0..CALLERS)
                    .map(|i| {
                        let (sandbox, barrier) = (&sandbox, &barrier);
                        scope.spawn(move || {
                            let name = format!("name-{i}");
                            let _ = barrier.wait();
                            let result =
                                sandbox.set_config(Some(config_named(&name)));
                            (name, result)
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().expect("caller panicked"))
                    .collect()
            });

        let winners: Vec<_> =
            results.iter().filter(|(_, result)| result.is_ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(results.iter().all(|(_, result)| {
            result.is_ok() || *result == Err(SandboxError::ConfigAlreadySet)
        }));
        assert_eq!(sandbox.name(), Some(winners[0].0.as_str()));
    }

    #[test]
    fn sandbox_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Arc<Sandbox>>();
    }

    #[test]
    fn mark_ready_requires_config() {
        let sandbox = sandbox();
        assert_eq!(
            sandbox.mark_ready(),
            Err(SandboxError::ConfigNotSet { sandbox_id: SandboxId::new("sandbox") })
        );
        assert_eq!(sandbox.state(), SandboxState::Configuring);

        sandbox.set_config(Some(config_named("name"))).expect("set config");
        sandbox.mark_ready().expect("mark ready");
        assert_eq!(sandbox.state(), SandboxState::Ready);
    }

    #[test]
    fn not_ready_is_terminal() {
        let sandbox = sandbox();
        sandbox.set_config(Some(config_named("name"))).expect("set config");
        sandbox.mark_ready().expect("mark ready");
        sandbox.mark_not_ready();
        sandbox.mark_not_ready();
        assert_eq!(sandbox.state(), SandboxState::NotReady);

        assert!(matches!(
            sandbox.mark_ready(),
            Err(SandboxError::InvalidTransition {
                from: SandboxState::NotReady,
                to: SandboxState::Ready,
                ..
            })
        ));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(SandboxId::generate(), SandboxId::generate());
    }

    #[test]
    fn validated_id_must_not_be_empty() {
        assert!(SandboxId::validate(Some(String::new()), "pod_sandbox_id", None)
            .is_err());
        assert_eq!(
            SandboxId::validate(Some("abc".into()), "pod_sandbox_id", None),
            Ok(SandboxId::new("abc"))
        );
    }
}
