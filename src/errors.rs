use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the credential layer can report.
///
/// The enum is `Clone` so a single refresh outcome can be handed to every
/// caller that waited on it; non-clonable sources are kept behind an `Arc`.
#[derive(Debug, Clone)]
pub enum Error {
    Io(Arc<std::io::Error>),
    Json(Arc<serde_json::Error>),
    Http(Arc<reqwest::Error>),
    /// Non-success status from the backend, or status 0 for connection-level failures.
    Network { status: u16, body: String },
    Timeout(Duration),
    Config(String),
    Cache(String),
    /// The issuing endpoint answered without a token value.
    EmptyToken,
    Refresh(Box<Error>),
    Initialization(Box<Error>),
    /// No token was available when a request was about to be sent.
    AuthMissing(Option<Box<Error>>),
    Disposed,
}

impl Error {
    /// Status code carried by the innermost network failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self.root_cause() {
            Error::Network { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Walks through the wrapping variants down to the original failure.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Refresh(inner) | Error::Initialization(inner) => inner.root_cause(),
            Error::AuthMissing(Some(inner)) => inner.root_cause(),
            other => other,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root_cause(), Error::Timeout(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::Http(err) => write!(f, "http error: {err}"),
            Error::Network { status, body } if body.is_empty() => {
                write!(f, "request failed with status {status}")
            }
            Error::Network { status, body } => {
                write!(f, "request failed with status {status}: {body}")
            }
            Error::Timeout(after) => write!(f, "request timed out after {after:?}"),
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Error::Cache(msg) => write!(f, "cache error: {msg}"),
            Error::EmptyToken => write!(f, "server returned empty verification token"),
            Error::Refresh(inner) => {
                write!(f, "failed to refresh API verification token: {inner}")
            }
            Error::Initialization(inner) => {
                write!(f, "failed to initialize API verification token: {inner}")
            }
            Error::AuthMissing(Some(inner)) => {
                write!(f, "cannot make API call without verification token: {inner}")
            }
            Error::AuthMissing(None) => {
                write!(f, "cannot make API call without verification token")
            }
            Error::Disposed => write!(f, "token manager has been disposed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err.as_ref()),
            Error::Json(err) => Some(err.as_ref()),
            Error::Http(err) => Some(err.as_ref()),
            Error::Refresh(inner) | Error::Initialization(inner) => Some(inner.as_ref()),
            Error::AuthMissing(Some(inner)) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(Arc::new(err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(Arc::new(err))
    }
}
