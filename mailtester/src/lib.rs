//! Send a single test email through an SMTP relay and report, step by step,
//! where the attempt stopped.
//!
//! The crate has two halves joined by one JSON exchange:
//!
//! - [`relay`]: the HTTP endpoint that validates a request, resolves SMTP
//!   parameters, builds a transport and sends one HTML email.
//! - [`form`]: the client-side controller that validates the form locally,
//!   drives the five-step progress list and calls the endpoint.
//!
//! Both sides speak the stage vocabulary in [`step`].

pub use mailtester_macros::StagedError;

pub mod client;
pub mod config;
pub mod form;
pub mod mail;
pub mod protocol;
pub mod relay;
pub mod step;

mod error;
mod serve;

pub use config::EnvConfig;
pub use error::RelayError;
pub use serve::{serve, shutdown_signal};

/// Implements `From<$source>` for `$target` by routing through its
/// `Unexpected(anyhow::Error)` variant.
#[macro_export]
macro_rules! anyhow_from {
    ($target:ty: $($source:path),+ $(,)?) => {
        $(
            impl From<$source> for $target {
                fn from(err: $source) -> Self {
                    <$target>::from(anyhow::Error::new(err))
                }
            }
        )+
    };
}
