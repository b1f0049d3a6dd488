use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Attribute, ItemStruct, Meta, Token, parse2, punctuated::Punctuated, spanned::Spanned};

use crate::{DeriveResult, constants_params::ConstantsParams};

macro_rules! error_spanned {
    ($span:expr => $message:expr $(,)?) => {
        syn::Error::new($span, $message)
    };
}

macro_rules! error {
    ($message:expr $(,)?) => {
        syn::Error::new(Span::call_site(), $message)
    };
}

pub(crate) fn derive_shader_constants(input: TokenStream) -> DeriveResult<TokenStream> {
    let item_struct = parse2::<ItemStruct>(input)
        .map_err(|_| error!("`#[derive(ShaderConstants)]` can only be used on structs"))?;
    let struct_name = &item_struct.ident;
    if !item_struct.generics.params.is_empty() {
        return Err(error_spanned!(
            item_struct.generics.span() =>
            "`#[derive(ShaderConstants)]` does not support generic structs"
        ));
    }
    if let syn::Fields::Unit = item_struct.fields {
        return Err(error_spanned!(
            struct_name.span() =>
            "`#[derive(ShaderConstants)]` does not support unit structs"
        ));
    }
    if !has_c_representation(&item_struct.attrs)? {
        return Err(error_spanned!(
            struct_name.span() =>
            "`#[derive(ShaderConstants)]` requires `#[repr(C)]` so that the layout matches the shader"
        ));
    }
    let params = parse_constants_attributes(&item_struct.attrs)?;
    let label = params.label.unwrap_or_else(|| struct_name.to_string());
    let size_message = format!(
        "`{struct_name}` must be a non-zero multiple of 16 bytes (the length of four floats) to be used as shader constants"
    );
    Ok(quote! {
        impl ::constant_buffer::ShaderConstants for #struct_name {
            const LABEL: &'static str = #label;
        }

        const _: () = {
            let size = ::std::mem::size_of::<#struct_name>();
            assert!(
                size != 0 && size % ::constant_buffer::CONSTANT_ALIGNMENT == 0,
                #size_message
            );
        };
    })
}

fn has_c_representation(attrs: &[Attribute]) -> DeriveResult<bool> {
    for attr in attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }
        let reprs = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        let is_c = reprs.iter().any(|repr| match repr {
            Meta::Path(path) => path.is_ident("C") || path.is_ident("transparent"),
            _ => false,
        });
        if is_c {
            return Ok(true);
        }
    }
    Ok(false)
}

fn parse_constants_attributes(attrs: &[Attribute]) -> DeriveResult<ConstantsParams> {
    let mut result: Option<ConstantsParams> = None;
    for attr in attrs {
        if !attr.path().is_ident("constants") {
            continue;
        }
        if result.is_some() {
            return Err(
                error_spanned!(attr.span() => "multiple `#[constants(...)]` attributes are not allowed"),
            );
        }
        result = Some(attr.parse_args::<ConstantsParams>()?);
    }
    Ok(result.unwrap_or_default())
}
