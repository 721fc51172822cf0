//! Error taxonomy shared by the resolver crates

use crate::model::FailReason;

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while probing a stream or querying a provider.
///
/// Provider fetchers catch these at their own boundary and downgrade them to
/// "no title"; only the ICY probe lets them surface, and the orchestrator
/// converts them into `FailReason`s rather than propagating.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport/TLS failure reaching the stream or a provider
    #[error("connect failed: {0}")]
    Connect(String),

    /// The stream response does not declare `icy-metaint`
    #[error("stream does not expose ICY metadata")]
    NoIcyMeta,

    /// Budget exhausted waiting for a frame or response
    #[error("timed out waiting for metadata")]
    Timeout,

    /// Provider answered with a non-success HTTP status
    #[error("provider returned HTTP {0}")]
    ProviderHttp(u16),

    /// Provider body was not the expected shape
    #[error("provider response not parsable: {0}")]
    ProviderParse(String),

    /// Parsed fine but nothing title-shaped in it
    #[error("no usable title fields in response")]
    NoUsableFields,

    /// The supplied URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The stream ended or errored mid-read
    #[error("stream error: {0}")]
    Stream(String),
}

impl Error {
    /// The structured reason this error maps to on the wire
    pub fn fail_reason(&self) -> FailReason {
        match self {
            Error::Connect(_) => FailReason::ConnectError,
            Error::NoIcyMeta => FailReason::NoIcyMeta,
            Error::Timeout => FailReason::Timeout,
            Error::ProviderHttp(_) => FailReason::ProviderHttpError,
            Error::ProviderParse(_) => FailReason::ProviderParseError,
            Error::NoUsableFields => FailReason::NoUsableFields,
            Error::InvalidUrl(_) => FailReason::ConnectError,
            Error::Stream(_) => FailReason::ConnectError,
        }
    }
}
