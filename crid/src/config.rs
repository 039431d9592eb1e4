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

//! Runtime configuration loaded from TOML.
//!
//! Every key is optional. A missing section or key falls back to the
//! documented default, so an embedding daemon can start from
//! [`RuntimeConfig::default()`] and only read a file when one is configured.
//!
//! ```toml
//! [exec]
//! max_output_bytes = 16777216
//! drain_timeout_ms = 500
//! backend_grace_ms = 2000
//! nsenter = "/usr/bin/nsenter"
//! host_exec = false
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top level configuration for crid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Settings for synchronous exec.
    pub exec: ExecConfig,
}

/// Settings for synchronous exec.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecConfig {
    /// Upper bound on captured bytes per stream. Output past the cap is
    /// read and discarded so the process never blocks on a full pipe.
    pub max_output_bytes: usize,
    /// How long to keep reading pipes after the exec process is gone.
    pub drain_timeout_ms: u64,
    /// Extra time granted to a backend past the request deadline before the
    /// call is abandoned.
    pub backend_grace_ms: u64,
    /// The `nsenter` binary used to join a container's namespaces.
    pub nsenter: PathBuf,
    /// Run exec commands directly on the host when a container has no
    /// process to join. Off by default, in which case such an exec fails.
    pub host_exec: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: 16 * 1024 * 1024,
            drain_timeout_ms: 500,
            backend_grace_ms: 2000,
            nsenter: PathBuf::from("nsenter"),
            host_exec: false,
        }
    }
}

impl ExecConfig {
    /// [ExecConfig::drain_timeout_ms] as a [Duration].
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// [ExecConfig::backend_grace_ms] as a [Duration].
    pub fn backend_grace(&self) -> Duration {
        Duration::from_millis(self.backend_grace_ms)
    }
}

impl RuntimeConfig {
    /// Attempt to parse a config file into memory. An empty file is an error.
    pub fn parse_from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config_toml = String::new();
        let mut file = File::open(path).with_context(|| {
            format!("could not open config file {}", path.display())
        })?;

        if file
            .read_to_string(&mut config_toml)
            .with_context(|| "could not read RuntimeConfig toml")?
            == 0
        {
            return Err(anyhow!("empty config"));
        }

        Self::parse_from_toml(&config_toml)
    }

    /// Parse a config from a TOML string.
    pub fn parse_from_toml(config_toml: &str) -> Result<Self> {
        Ok(toml::from_str(config_toml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = RuntimeConfig::parse_from_toml("[exec]\n")
            .expect("failed to parse");
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.exec.drain_timeout(), Duration::from_millis(500));
        assert_eq!(config.exec.backend_grace(), Duration::from_secs(2));
    }

    #[test]
    fn exec_section_overrides_defaults() {
        let config = RuntimeConfig::parse_from_toml(
            r#"
            [exec]
            max_output_bytes = 1024
            drain_timeout_ms = 50
            nsenter = "/usr/bin/nsenter"
            host_exec = true
            "#,
        )
        .expect("failed to parse");

        assert_eq!(
            config.exec,
            ExecConfig {
                max_output_bytes: 1024,
                drain_timeout_ms: 50,
                backend_grace_ms: 2000,
                nsenter: PathBuf::from("/usr/bin/nsenter"),
                host_exec: true,
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RuntimeConfig::parse_from_toml("[exec]\nmax_output = 1\n");
        assert!(err.is_err());
    }

    #[test]
    fn empty_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let err = RuntimeConfig::parse_from_toml_file(file.path())
            .expect_err("empty file parsed");
        assert_eq!(err.to_string(), "empty config");
    }

    #[test]
    fn parses_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[exec]\ndrain_timeout_ms = 10").expect("write");

        let config = RuntimeConfig::parse_from_toml_file(file.path())
            .expect("failed to parse");
        assert_eq!(config.exec.drain_timeout_ms, 10);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(RuntimeConfig::parse_from_toml_file(dir.path().join("nope"))
            .is_err());
    }
}
