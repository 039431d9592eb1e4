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

#![warn(future_incompatible, nonstandard_style, unused)]
#![warn(clippy::unwrap_used)]

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod validation;

/// Scaffolds validation of a protobuf message into a strongly typed struct
/// by implementing `validation::ValidatedType` on the validated struct.
///
/// # Example
/// // Given the wire message:
/// struct StartContainerRequest {
///     container_id: String
/// }
///
/// // Create this struct (named after the message with a `Validated` prefix):
/// #[derive(validation_macros::ValidatedType)]
/// struct ValidatedStartContainerRequest {
///     #[field_type(String)]
///     #[validate]
///     container_id: ContainerId
/// }
///
/// The macro generates a trait `StartContainerRequestTypeValidator` and an
/// empty struct `StartContainerRequestValidator`. You must
/// `impl StartContainerRequestTypeValidator for StartContainerRequestValidator`,
/// providing a `validate_<field>` function for every field without a
/// `validate` attribute.
///
/// Fields of the message that are not named in the validated struct are
/// ignored.
///
/// Decorate fields with `field_type` when the wire type differs from the
/// validated type. Decorate fields with `validate` to get a default
/// implementation:
/// * `#[validate]` calls `ValidatedField::validate` with the input wrapped in `Some`
/// * `#[validate(opt)]` calls `ValidatedField::validate_optional`
/// * `#[validate(create)]` calls `ValidatedField::validate_for_creation`
/// * `#[validate(none)]` passes the input through (input and output type must match)
#[proc_macro_derive(ValidatedType, attributes(field_type, validate))]
pub fn validated_type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    validation::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
