extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod staged_error;

/// Derive macro mapping error variants to an HTTP status, a user-facing message
/// and the pipeline stage that produced them.
///
/// Every variant carries `#[http_error(...)]` and may carry `#[stage(...)]`.
///
/// `http_error` accepts one or two arguments
/// - status code (required): a `StatusCode` constant (`BAD_REQUEST`) or a number (`400`)
/// - http error message (optional): a string literal with basic interpolation.
///   Tuple variants interpolate indices (`"{0}"`), struct variants interpolate
///   field names (`"{field}"`). Without it, the `Display` implementation is used.
///
/// `stage` names a `StepKey` variant. The `StepKey` type must be in scope where
/// the derive is used. When at least one variant has a stage, the derive also
/// generates `stage(&self) -> Option<StepKey>`; variants without one return `None`.
///
/// Generated methods:
/// - `http_code(&self) -> http::StatusCode`
/// - `http_message(&self) -> String`
/// - `stage(&self) -> Option<StepKey>` (only when a stage is declared)
///
/// ### Example
///
/// ```rust,ignore
/// use crate::step::StepKey;
///
/// #[derive(Debug, thiserror::Error, mailtester::StagedError)]
/// enum RelayError {
///     #[error("missing required fields")]
///     #[http_error(BAD_REQUEST)]
///     #[stage(ValidateEmail)]
///     MissingFields,
///
///     #[error("failed to send: {0}")]
///     #[http_error(500)]
///     #[stage(SendEmail)]
///     Send(String),
///
///     #[error("lookup failed: {0:?}")]
///     #[http_error(INTERNAL_SERVER_ERROR, "an internal server error occurred")]
///     Anyhow(#[from] anyhow::Error),
/// }
/// ```
#[proc_macro_derive(StagedError, attributes(http_error, stage))]
pub fn staged_error_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    staged_error::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
