//! Error types for the clients_daily query generators

use std::fmt;

/// Result type alias for generator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the clients_daily query generators
#[derive(Debug)]
pub enum Error {
    /// The schema could not be retrieved (bq failure, unreadable file)
    SchemaFetch(String),
    /// The probe registry could not be retrieved (network, non-2xx status)
    RegistryFetch(String),
    /// The schema payload is missing required keys or has the wrong shape
    MalformedSchema(String),
    /// The probe registry payload is not a JSON object
    MalformedRegistry(String),
    /// Configuration errors
    Config(String),
    /// IO errors
    Io(std::io::Error),
}

impl Error {
    /// Whether this error came from one of the external sources rather than
    /// from the shape of the data they returned.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::SchemaFetch(_) | Error::RegistryFetch(_))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SchemaFetch(msg) => write!(f, "Schema fetch failed: {}", msg),
            Error::RegistryFetch(msg) => write!(f, "Probe registry fetch failed: {}", msg),
            Error::MalformedSchema(msg) => write!(f, "Malformed schema: {}", msg),
            Error::MalformedRegistry(msg) => write!(f, "Malformed probe registry: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_are_distinguished_from_malformed_payloads() {
        assert!(Error::SchemaFetch("bq exited 1".into()).is_fetch_failure());
        assert!(Error::RegistryFetch("503".into()).is_fetch_failure());
        assert!(!Error::MalformedSchema("missing name".into()).is_fetch_failure());

        let msg = Error::MalformedSchema("missing field `name`".into()).to_string();
        assert!(msg.starts_with("Malformed schema"));
    }
}
