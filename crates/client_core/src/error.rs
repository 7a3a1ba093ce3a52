use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP call itself failed before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The relay answered with a non-2xx status.
    #[error("relay returned {status}: {message}")]
    Relay { status: u16, message: String },
}
