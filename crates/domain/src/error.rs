/// Shared error type used across all chatgate crates.
///
/// Collaborator failures land here. The gate renders them into a
/// business-failure envelope instead of failing the call.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// A collaborator processed the request and rejected it
    /// (duplicate user, wrong password, unknown user, ...).
    #[error("{service}: {message}")]
    Backend { service: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn backend(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            service: service.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_renders_service_and_message() {
        let err = Error::backend("store", "user alice already exists");
        assert_eq!(err.to_string(), "store: user alice already exists");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
