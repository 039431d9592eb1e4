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

use super::ValidationError;
use validator::HasLen;

/// Unwraps an optional protobuf field, failing with
/// [ValidationError::Required] when it was not sent.
pub fn required<T>(
    value: Option<T>,
    field_name: &str,
    parent_name: Option<&str>,
) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::Required {
        field: super::field_name(field_name, parent_name),
    })
}

/// Same as [required], but a present value of length zero is also rejected.
///
/// Protobuf cannot tell an unset string from an empty one, so identifiers
/// arriving on the wire are validated with this.
pub fn required_not_empty<T: HasLen>(
    value: Option<T>,
    field_name: &str,
    parent_name: Option<&str>,
) -> Result<T, ValidationError> {
    let value = required(value, field_name, parent_name)?;

    if value.length() == 0 {
        return Err(ValidationError::Required {
            field: super::field_name(field_name, parent_name),
        });
    }

    Ok(value)
}
