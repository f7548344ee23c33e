use serde::Serialize;

/// A single HTML email, ready to hand to a [`Mailer`](super::Mailer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutgoingEmail {
    /// Wraps a plain-text `message` into the relay's HTML body.
    pub fn compose(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        message: &str,
    ) -> Self {
        OutgoingEmail {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            html: render_html_body(message),
        }
    }
}

/// Escapes `&`, `<`, `>`, `"` and `'` for inclusion in HTML text.
///
/// `&` is handled first so entities produced for the other characters are
/// never escaped twice.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<p>` + escaped text with newlines turned into `<br/>` + `</p>`.
pub fn render_html_body(message: &str) -> String {
    format!("<p>{}</p>", escape_html(message).replace('\n', "<br/>"))
}
