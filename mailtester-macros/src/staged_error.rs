use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, Token};

enum Shape {
    Unit,
    Tuple(usize),
    Named(Vec<Ident>),
}

struct VariantSpec {
    ident: Ident,
    shape: Shape,
    code: TokenStream,
    message: Option<String>,
    stage: Option<Ident>,
}

pub(crate) fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let data = match input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "StagedError can only be derived for enums",
            ))
        }
    };

    let mut specs = Vec::with_capacity(data.variants.len());
    for variant in data.variants {
        let (code, message) = parse_http_error(&variant.ident, &variant.attrs)?;
        let stage = parse_stage(&variant.attrs)?;
        let shape = match variant.fields {
            Fields::Unit => Shape::Unit,
            Fields::Unnamed(fields) => Shape::Tuple(fields.unnamed.len()),
            Fields::Named(fields) => Shape::Named(
                fields
                    .named
                    .into_iter()
                    .filter_map(|f| f.ident)
                    .collect(),
            ),
        };
        specs.push(VariantSpec {
            ident: variant.ident,
            shape,
            code,
            message,
            stage,
        });
    }

    let code_arms = specs.iter().map(|spec| {
        let pattern = wildcard_pattern(spec);
        let code = &spec.code;
        quote! { #pattern => #code, }
    });

    let message_arms = specs.iter().map(message_arm);

    let stage_fn = if specs.iter().any(|spec| spec.stage.is_some()) {
        let arms = specs.iter().map(|spec| {
            let pattern = wildcard_pattern(spec);
            match &spec.stage {
                Some(stage) => quote! { #pattern => Some(StepKey::#stage), },
                None => quote! { #pattern => None, },
            }
        });
        quote! {
            pub fn stage(&self) -> Option<StepKey> {
                match self {
                    #(#arms)*
                }
            }
        }
    } else {
        TokenStream::new()
    };

    Ok(quote! {
        impl #name {
            pub fn http_code(&self) -> http::StatusCode {
                match self {
                    #(#code_arms)*
                }
            }

            pub fn http_message(&self) -> String {
                match self {
                    #(#message_arms)*
                }
            }

            #stage_fn
        }
    })
}

fn parse_http_error(variant: &Ident, attrs: &[Attribute]) -> syn::Result<(TokenStream, Option<String>)> {
    let attr = attrs
        .iter()
        .find(|attr| attr.path().is_ident("http_error"))
        .ok_or_else(|| syn::Error::new_spanned(variant, "missing #[http_error(...)] attribute"))?;

    let args = attr.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?;
    let mut args = args.into_iter();

    let code = match args.next() {
        Some(Expr::Path(path)) => {
            let path = path.path;
            quote! { http::StatusCode::#path }
        }
        Some(Expr::Lit(lit)) => match lit.lit {
            Lit::Int(int) => {
                let code = int.base10_parse::<u16>()?;
                if !(100..=999).contains(&code) {
                    return Err(syn::Error::new_spanned(int, "status code must be in 100..=999"));
                }
                quote! { http::StatusCode::from_u16(#code).expect("status code checked at compile time") }
            }
            other => return Err(syn::Error::new_spanned(other, "expected a status code")),
        },
        Some(other) => return Err(syn::Error::new_spanned(other, "expected a status code")),
        None => return Err(syn::Error::new_spanned(attr, "expected a status code")),
    };

    let message = match args.next() {
        Some(Expr::Lit(lit)) => match lit.lit {
            Lit::Str(s) => Some(s.value()),
            other => return Err(syn::Error::new_spanned(other, "expected a message string")),
        },
        Some(other) => return Err(syn::Error::new_spanned(other, "expected a message string")),
        None => None,
    };

    if let Some(extra) = args.next() {
        return Err(syn::Error::new_spanned(extra, "unexpected argument"));
    }

    Ok((code, message))
}

fn parse_stage(attrs: &[Attribute]) -> syn::Result<Option<Ident>> {
    attrs
        .iter()
        .find(|attr| attr.path().is_ident("stage"))
        .map(|attr| attr.parse_args::<Ident>())
        .transpose()
}

fn wildcard_pattern(spec: &VariantSpec) -> TokenStream {
    let ident = &spec.ident;
    match spec.shape {
        Shape::Unit => quote! { Self::#ident },
        Shape::Tuple(_) => quote! { Self::#ident(..) },
        Shape::Named(_) => quote! { Self::#ident { .. } },
    }
}

fn message_arm(spec: &VariantSpec) -> TokenStream {
    let ident = &spec.ident;
    let Some(msg) = &spec.message else {
        let pattern = wildcard_pattern(spec);
        return quote! { #pattern => self.to_string(), };
    };

    match &spec.shape {
        Shape::Unit => quote! { Self::#ident => #msg.to_string(), },
        Shape::Tuple(len) => {
            let bindings: Vec<Ident> = (0..*len)
                .map(|i| format_ident!("__field{}", i, span = Span::call_site()))
                .collect();
            let msg = positional_to_named(msg);
            quote! {
                #[allow(unused_variables)]
                Self::#ident(#(#bindings),*) => format!(#msg),
            }
        }
        Shape::Named(fields) => quote! {
            #[allow(unused_variables)]
            Self::#ident { #(#fields),* } => format!(#msg),
        },
    }
}

/// Rewrites `{0}` style placeholders to the `__field0` bindings of a tuple variant.
fn positional_to_named(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_braces = false;
    let mut at_start = false;

    for c in input.chars() {
        match c {
            '{' => {
                in_braces = true;
                at_start = true;
                out.push(c);
            }
            '}' => {
                in_braces = false;
                out.push(c);
            }
            _ if in_braces && at_start && c.is_ascii_digit() => {
                out.push_str("__field");
                out.push(c);
                at_start = false;
            }
            _ => {
                at_start = false;
                out.push(c);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::positional_to_named;

    #[test]
    fn rewrites_positional_placeholders() {
        assert_eq!(positional_to_named("a={0} b={1}"), "a={__field0} b={__field1}");
        assert_eq!(positional_to_named("{0:?}"), "{__field0:?}");
        assert_eq!(positional_to_named("{{literal}} {name}"), "{{literal}} {name}");
    }
}
