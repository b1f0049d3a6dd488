use syn::{Ident, LitStr, Token, parse::Parse};

use crate::DeriveResult;

/// Parameters of `#[constants(...)]`.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConstantsParams {
    pub(crate) label: Option<String>,
}

impl Parse for ConstantsParams {
    fn parse(input: syn::parse::ParseStream) -> DeriveResult<Self> {
        let mut label: Option<String> = None;

        while !input.is_empty() {
            let key = input.parse::<Ident>()?;
            input.parse::<Token![=]>()?;
            match key.to_string().as_str() {
                "label" => {
                    let lit = input.parse::<LitStr>()?;
                    if label.is_some() {
                        return Err(syn::Error::new(lit.span(), "`label` is specified more than once"));
                    }
                    if lit.value().is_empty() {
                        return Err(syn::Error::new(lit.span(), "`label` cannot be empty"));
                    }
                    label = Some(lit.value());
                }
                _ => {
                    return Err(syn::Error::new(
                        key.span(),
                        "unknown field (availible fields are: `label`)",
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(Self { label })
    }
}
