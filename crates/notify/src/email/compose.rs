//! RFC 822 style message rendering, independent of any transport.

use chrono::Utc;

use crate::config::EmailConfig;

/// Join recipients for the `To:` header. No recipients yields `""`.
pub fn format_recipients(recipients: &[String]) -> String {
    recipients
        .iter()
        .map(|r| header_value(r))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Header values are single-line: each CR or LF becomes a space.
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Render headers and the plain-text body.
///
/// Header order is fixed: From, To, Reply-To (only when configured),
/// Subject, Date, MIME-Version, Content-Type. The message follows a blank
/// line, unmodified. Line breaks inside header values are flattened so
/// a subject cannot start a new header.
pub fn build_email_body(config: &EmailConfig, subject: &str, message: &str) -> String {
    let mut headers = vec![
        format!("From: {}", header_value(&config.from)),
        format!("To: {}", format_recipients(&config.to)),
    ];
    if let Some(reply_to) = config.reply_to.as_deref().filter(|r| !r.is_empty()) {
        headers.push(format!("Reply-To: {}", header_value(reply_to)));
    }
    headers.push(format!("Subject: {}", header_value(subject)));
    headers.push(format!("Date: {}", Utc::now().to_rfc2822()));
    headers.push("MIME-Version: 1.0".to_string());
    headers.push("Content-Type: text/plain; charset=UTF-8".to_string());

    let mut body = headers.join("\r\n");
    body.push_str("\r\n\r\n");
    body.push_str(message);
    body
}
