use outreach_core::message::MessageType;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// No channel is registered for the message type (missing credentials).
    #[error("No delivery channel configured for {0}")]
    NotConfigured(MessageType),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("Provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Still throttled after every retry.
    #[error("Rate limited by provider after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),

    /// The message cannot be addressed on this channel.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The rate limiter's concurrency semaphore was closed.
    #[error("Rate limiter unavailable: {0}")]
    LimiterClosed(#[from] tokio::sync::AcquireError),

    /// The provider response could not be understood.
    #[error("Unexpected provider response: {0}")]
    Decode(String),
}

impl ChannelError {
    /// Whether the failure means the recipient will never receive the
    /// message (logged as bounced rather than retried).
    pub fn is_permanent(&self) -> bool {
        match self {
            ChannelError::InvalidRecipient(_) | ChannelError::Address(_) => true,
            ChannelError::HttpStatus { status, .. } => {
                (400..500).contains(status) && *status != 429
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_permanent() {
        let err = ChannelError::HttpStatus { status: 404, body: String::new() };
        assert!(err.is_permanent());
        let err = ChannelError::HttpStatus { status: 503, body: String::new() };
        assert!(!err.is_permanent());
        assert!(!ChannelError::RateLimited { retries: 3 }.is_permanent());
    }

    #[test]
    fn not_configured_names_the_type() {
        let err = ChannelError::NotConfigured(MessageType::Reddit);
        assert_eq!(err.to_string(), "No delivery channel configured for reddit");
    }
}
