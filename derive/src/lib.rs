pub(crate) type DeriveResult<T> = Result<T, syn::Error>;

pub(crate) mod constants_params;
pub(crate) mod shader_constants;

#[proc_macro_derive(ShaderConstants, attributes(constants))]
pub fn derive_shader_constants_(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    match shader_constants::derive_shader_constants(input.into()) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}
