//! Network transports behind the webhook and email notifiers.
//!
//! Both notifiers take their transport as an injected trait object so the
//! payload and connection logic can be exercised without network I/O.

pub mod http;
pub mod smtp;

pub use http::{HttpTransport, ReqwestTransport, WebhookRequest};
pub use smtp::{LettreTransport, SmtpConnection, SmtpMode, SmtpTransport};
