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

//! Process wide tracing setup.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber was already installed.
    #[error(transparent)]
    TryInitError(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs a compact stdout subscriber filtered to the `crid` target.
///
/// `verbose` lowers the level from INFO to TRACE. Calling this a second
/// time in the same process fails with [LoggingError::TryInitError].
pub fn init(verbose: bool) -> Result<(), LoggingError> {
    let tracing_level = if verbose { Level::TRACE } else { Level::INFO };

    let stdout_layer = tracing_subscriber::Layer::with_filter(
        tracing_subscriber::fmt::layer().compact(),
        EnvFilter::new(filter_directive(tracing_level)),
    );

    tracing_subscriber::registry().with(stdout_layer).try_init()?;
    Ok(())
}

fn filter_directive(level: Level) -> String {
    format!("crid={level}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case(Level::INFO, "crid=INFO"; "default level")]
    #[test_case(Level::TRACE, "crid=TRACE"; "verbose level")]
    #[test]
    fn filter_directive_targets_crate(level: Level, expected: &str) {
        assert_eq!(filter_directive(level), expected);
    }

    #[test]
    fn init_twice_fails() {
        // the first call may lose to another test in the same binary
        let _ = init(false);
        assert!(matches!(init(true), Err(LoggingError::TryInitError(_))));
    }
}
