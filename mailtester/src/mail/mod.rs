//! The SMTP capability behind the relay endpoint.
//!
//! Sending is split in two fallible stages so failures can be attributed:
//! a [`Connector`] builds a transport from resolved [`SmtpSettings`], and the
//! resulting [`Mailer`] transmits one [`OutgoingEmail`].
//!
//! [`SmtpConnector`] is backed by [lettre](https://lettre.rs);
//! [`StubConnector`] keeps everything in memory.

mod mailer;
mod message;
mod stub;

pub use mailer::{Connector, Mailer, SmtpConnector, SmtpMailer, SmtpSettings};
pub use message::{escape_html, render_html_body, OutgoingEmail};
pub use stub::{StubConnector, StubOutcome};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("{0}")]
    Transport(String),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("{0}")]
    Smtp(String),
}
