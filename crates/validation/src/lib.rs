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

pub use self::required::{required, required_not_empty};

mod required;

pub trait ValidatedType<T> {
    fn validate(
        input: T,
        parent_name: Option<&str>,
    ) -> Result<Self, ValidationError>
    where
        Self: Sized;
}

pub trait ValidatedField<T>
where
    Self: Sized,
{
    fn validate(
        input: Option<T>,
        field_name: &str,
        parent_name: Option<&str>,
    ) -> Result<Self, ValidationError>;

    /// Default implementation returns immediately when input is `None`.
    /// Otherwise, calls `Self::validate`.
    fn validate_optional(
        input: Option<T>,
        field_name: &str,
        parent_name: Option<&str>,
    ) -> Result<Option<Self>, ValidationError> {
        if input.is_none() {
            return Ok(None);
        }

        Ok(Some(Self::validate(input, field_name, parent_name)?))
    }

    /// Default implementation calls `Self::validate`.
    ///
    /// Stricter checks that only apply when an object is first created
    /// belong in an override of this function.
    fn validate_for_creation(
        input: Option<T>,
        field_name: &str,
        parent_name: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Self::validate(input, field_name, parent_name)
    }
}

pub fn field_name(field_name: &str, parent_name: Option<&str>) -> String {
    match parent_name {
        None => field_name.to_string(),
        Some(parent_name) => format!("{parent_name}.{field_name}"),
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field = {field}; Required")]
    Required { field: String },
}

impl ValidationError {
    pub fn get_field(&self) -> &str {
        match self {
            Self::Required { field } => field,
        }
    }
}
