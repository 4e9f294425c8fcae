/// Uniform error definition for the query client.
#[derive(Debug, thiserror::Error)]
pub enum QueryErr {
    /// Address could not be resolved or routed. Never retried.
    #[error("host {0} is unreachable or invalid")]
    UnreachableHost(String),
    /// No datagram arrived within the configured timeout.
    #[error("timed out waiting for a response")]
    Timeout,
    /// Response too short to carry a header.
    #[error("malformed packet: expected at least 5 bytes, got {0}")]
    MalformedPacket(usize),
    /// The handshake retry budget is exhausted.
    #[error("handshake retry limit reached after {attempts} attempts (is the server up with enable-query=true?)")]
    HandshakeFailed { attempts: u32 },
    /// Payload does not match the expected layout.
    #[error("decode error: {0}")]
    DecodeErr(String),
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    ConfErr(String),
    /// Any other socket level failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl QueryErr {
    /// Whether the error is a lost or truncated datagram, which the session
    /// recovers from by re-handshaking.
    pub fn is_transient(&self) -> bool {
        matches!(self, QueryErr::Timeout | QueryErr::MalformedPacket(_))
    }
}
