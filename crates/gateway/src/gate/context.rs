use super::GateError;

/// Per-call metadata supplied by the transport.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    remote: Option<String>,
}

impl CallContext {
    pub fn new(remote: Option<String>) -> Self {
        Self {
            remote: remote.filter(|r| !r.trim().is_empty()),
        }
    }

    /// Context for a caller at `address`.
    pub fn with_remote(address: impl Into<String>) -> Self {
        Self::new(Some(address.into()))
    }

    /// The caller's network address, the session key.
    pub fn remote_address(&self) -> Result<&str, GateError> {
        self.remote.as_deref().ok_or(GateError::InvalidContext)
    }
}
