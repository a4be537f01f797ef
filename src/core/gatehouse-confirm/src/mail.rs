//! Confirmation mails.
//!
//! Rendering templates and delivering messages belong to the host
//! application; this module only defines the seams ([`MailTemplate`],
//! [`MailTransport`]) and the message layout convention: the first
//! non-empty line of the rendered text is the subject, the rest is the body.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfirmError;

/// A rendered email ready for delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Optional HTML alternative.
    pub html: Option<String>,
    /// Recipients.
    pub to: Vec<String>,
}

impl MailMessage {
    /// Sets the recipients.
    pub fn with_to(mut self, to: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.to = to.into_iter().map(Into::into).collect();
        self
    }
}

/// Builds a [`MailMessage`] from a rendered text template.
///
/// The first non-empty line becomes the subject, the remaining lines the
/// body with leading and trailing newlines removed.
pub fn render_to_mail(text: &str, html: Option<String>) -> MailMessage {
    let mut lines = text.lines();

    let subject = lines
        .by_ref()
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string();

    let body = lines.collect::<Vec<_>>().join("\n").trim_matches('\n').to_string();

    MailMessage {
        subject,
        body,
        html,
        to: Vec::new(),
    }
}

/// Appends `code` to `base` as a path segment followed by a trailing slash.
///
/// `https://example.com/email/` + `code` gives
/// `https://example.com/email/<code>/`.
pub fn confirmation_url(base: &Url, code: &str) -> Result<Url, ConfirmError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ConfirmError::InvalidUrl(format!("{base} cannot be a base")))?
        .pop_if_empty()
        .push(code)
        .push("");
    Ok(url)
}

/// Renders the text of a confirmation mail for a link.
pub trait MailTemplate: Send + Sync {
    /// Plain text; the first non-empty line is the subject.
    fn render_text(&self, url: &Url) -> String;

    /// Optional HTML alternative.
    fn render_html(&self, _url: &Url) -> Option<String> {
        None
    }

    /// Renders the complete message for `to`.
    fn render(&self, url: &Url, to: &str) -> MailMessage {
        render_to_mail(&self.render_text(url), self.render_html(url)).with_to([to])
    }
}

/// Built-in plain-text registration mail.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationTemplate;

impl MailTemplate for RegistrationTemplate {
    fn render_text(&self, url: &Url) -> String {
        format!(
            "Confirm your email address\n\n\
             Please follow the link below to confirm your email address:\n\n\
             {url}\n\n\
             If you did not request this, you can ignore this message.\n"
        )
    }
}

/// Delivers rendered messages (SMTP relay, HTTP mail API, test outbox).
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sends `message` to its recipients.
    async fn send(&self, message: &MailMessage) -> Result<(), ConfirmError>;
}
