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

use heck::ToSnakeCase;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::{spanned::Spanned, Attribute, Data, DeriveInput, Fields, Type};

enum AutoValidate {
    No,
    Validate,
    ValidateOpt,
    ValidateNone,
    ValidateForCreation,
}

pub(crate) fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let DeriveInput { ident: validated_type_ident, data, .. } = input;

    let Some(type_name) =
        validated_type_ident.to_string().strip_prefix("Validated").map(str::to_owned)
    else {
        return Err(syn::Error::new(
            validated_type_ident.span(),
            "validated type should be named the same as the unvalidated type with a `Validated` prefix",
        ));
    };

    let type_ident = Ident::new(&type_name, validated_type_ident.span());
    let validator_trait_ident = format_ident!("{}TypeValidator", type_ident);
    let validator_struct_ident = format_ident!("{}Validator", type_ident);

    let fields = match data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            fields => {
                return Err(syn::Error::new(
                    fields.span(),
                    "validated type should have named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                validated_type_ident.span(),
                "validated type should be a struct",
            ))
        }
    };

    let mut field_names = Vec::with_capacity(fields.len());
    let mut field_validations = Vec::with_capacity(fields.len());
    let mut validator_fns = Vec::with_capacity(fields.len());

    for field in &fields {
        let Some(field_ident) = field.ident.clone() else {
            return Err(syn::Error::new(field.span(), "expected named field"));
        };

        let validation_fn_ident = format_ident!("validate_{}", field_ident);
        let field_name = field_ident.to_string().to_snake_case();
        let validated_field_type = &field.ty;
        let input_type =
            field_type(&field.attrs)?.unwrap_or_else(|| field.ty.clone());

        field_validations.push(quote! {
            let #field_ident = #validator_struct_ident::#validation_fn_ident(
                #field_ident,
                #field_name,
                parent_name
            )?;
        });

        let signature = quote! {
            fn #validation_fn_ident(
                #field_ident: #input_type,
                field_name: &str,
                parent_name: Option<&str>
            ) -> ::std::result::Result<
                #validated_field_type,
                ::validation::ValidationError
            >
        };

        validator_fns.push(match auto_validate(&field.attrs)? {
            AutoValidate::No => quote! { #signature; },
            AutoValidate::Validate => quote! {
                #signature {
                    ::validation::ValidatedField::validate(
                        Some(#field_ident),
                        field_name,
                        parent_name
                    )
                }
            },
            AutoValidate::ValidateOpt => quote! {
                #signature {
                    ::validation::ValidatedField::validate_optional(
                        #field_ident,
                        field_name,
                        parent_name
                    )
                }
            },
            AutoValidate::ValidateForCreation => quote! {
                #signature {
                    ::validation::ValidatedField::validate_for_creation(
                        Some(#field_ident),
                        field_name,
                        parent_name
                    )
                }
            },
            AutoValidate::ValidateNone => quote! {
                #signature {
                    let _ = (field_name, parent_name);
                    Ok(#field_ident)
                }
            },
        });

        field_names.push(field_ident);
    }

    Ok(quote! {
        impl ::validation::ValidatedType<#type_ident> for #validated_type_ident {
            fn validate(
                input: #type_ident,
                parent_name: Option<&str>,
            ) -> ::std::result::Result<Self, ::validation::ValidationError> {
                #validator_struct_ident::pre_validate(&input, parent_name)?;

                let #type_ident { #(#field_names,)* .. } = input;

                #(#field_validations)*

                let output = #validated_type_ident {
                    #(#field_names,)*
                };

                #validator_struct_ident::post_validate(&output, parent_name)?;

                Ok(output)
            }
        }

        trait #validator_trait_ident {
            #(#validator_fns)*

            fn pre_validate(
                _input: &#type_ident,
                _parent_name: Option<&str>
            ) -> ::std::result::Result<(), ::validation::ValidationError> {
                Ok(())
            }

            fn post_validate(
                _output: &#validated_type_ident,
                _parent_name: Option<&str>
            ) -> ::std::result::Result<(), ::validation::ValidationError> {
                Ok(())
            }
        }

        struct #validator_struct_ident;
    })
}

/// Reads `#[field_type(T)]`, the wire type of a field.
fn field_type(attrs: &[Attribute]) -> syn::Result<Option<Type>> {
    let mut found = attrs.iter().filter(|attr| attr.path.is_ident("field_type"));

    let Some(attr) = found.next() else {
        return Ok(None);
    };

    if let Some(duplicate) = found.next() {
        return Err(syn::Error::new(
            duplicate.span(),
            "a maximum of one `field_type` attribute is supported",
        ));
    }

    attr.parse_args::<Type>().map(Some)
}

fn auto_validate(attrs: &[Attribute]) -> syn::Result<AutoValidate> {
    let Some(attr) = attrs.iter().find(|attr| attr.path.is_ident("validate"))
    else {
        return Ok(AutoValidate::No);
    };

    if attr.tokens.is_empty() {
        return Ok(AutoValidate::Validate);
    }

    let arg = attr.parse_args::<Ident>()?;
    match arg.to_string().as_str() {
        "opt" => Ok(AutoValidate::ValidateOpt),
        "none" => Ok(AutoValidate::ValidateNone),
        "create" => Ok(AutoValidate::ValidateForCreation),
        _ => Err(syn::Error::new(
            arg.span(),
            "`opt`, `none`, and `create` are the valid args for the `validate` attribute",
        )),
    }
}
