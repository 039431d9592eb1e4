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

//! Guards for tests that need privileges or host tooling the CI sandbox may
//! not provide. A skipped test prints why and returns early.

// Lint groups: https://doc.rust-lang.org/rustc/lints/groups.html
#![warn(future_incompatible, nonstandard_style, unused)]
#![warn(
    missing_debug_implementations,
    trivial_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_results
)]
#![warn(clippy::unwrap_used)]

#[doc(hidden)]
pub use nix;

// Nix has a collection of test helpers that are not exposed publicly by their crate
// The below skip helpers are modelled on: https://github.com/nix-rust/nix/blob/master/test/common/mod.rs

#[macro_export]
macro_rules! skip {
    ($($reason: expr),+) => {
        use ::std::io::{self, Write};

        let stderr = io::stderr();
        let mut handle = stderr.lock();
        let _ = writeln!(handle, $($reason),+);
        return;
    }
}

#[macro_export]
macro_rules! skip_if_not_root {
    ($name:expr) => {
        if !$crate::nix::unistd::Uid::current().is_root() {
            $crate::skip!("{} requires root privileges. Skipping test.", $name);
        }
    };
}

#[macro_export]
macro_rules! skip_if_seccomp {
    ($name:expr) => {
        if let Ok(s) = ::std::fs::read_to_string("/proc/self/status") {
            for l in s.lines() {
                let mut fields = l.split_whitespace();
                if fields.next() == Some("Seccomp:")
                    && fields.next() != Some("0")
                {
                    $crate::skip!(
                        "{} cannot be run in Seccomp mode.  Skipping test.",
                        $name
                    );
                }
            }
        }
    };
}

/// Skips when `$binary` cannot be found on `$PATH`.
#[macro_export]
macro_rules! skip_if_missing_binary {
    ($name:expr, $binary:expr) => {
        if !$crate::binary_on_path($binary) {
            $crate::skip!(
                "{} requires `{}` on $PATH. Skipping test.",
                $name,
                $binary
            );
        }
    };
}

#[doc(hidden)]
pub fn binary_on_path(binary: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };

    std::env::split_paths(&path).any(|dir| dir.join(binary).is_file())
}
