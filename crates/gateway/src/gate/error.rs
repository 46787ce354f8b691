use cg_protocol::Method;

/// Call-level failures raised by the gate itself.
///
/// These fail the call at the transport level.  Collaborator failures never
/// appear here; they are rendered into a business-failure envelope instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The caller's network address is missing from the call context.
    #[error("invalid call context: caller address unavailable")]
    InvalidContext,

    /// The operation requires an Online session.
    #[error("{method}: current user is offline")]
    Unauthenticated { method: Method },

    #[error("{0}: method not implemented")]
    NotImplemented(Method),

    #[error("undefined method: {0}")]
    UnknownMethod(String),

    /// The request body could not be decoded for this operation.
    #[error("{method}: invalid request: {reason}")]
    InvalidRequest { method: Method, reason: String },
}

impl GateError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidContext => "invalid_context",
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::NotImplemented(_) => "not_implemented",
            Self::UnknownMethod(_) => "unknown_method",
            Self::InvalidRequest { .. } => "invalid_request",
        }
    }
}

impl From<cg_protocol::UnknownMethod> for GateError {
    fn from(e: cg_protocol::UnknownMethod) -> Self {
        Self::UnknownMethod(e.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_method() {
        let err = GateError::Unauthenticated {
            method: Method::AddFriend,
        };
        assert_eq!(err.to_string(), "add_friend: current user is offline");
        assert_eq!(err.kind(), "unauthenticated");

        let err = GateError::NotImplemented(Method::UpdateUserPassword);
        assert_eq!(err.to_string(), "update_user_password: method not implemented");
    }

    #[test]
    fn unknown_method_converts() {
        let err: GateError = "bogus".parse::<Method>().unwrap_err().into();
        assert_eq!(err, GateError::UnknownMethod("bogus".into()));
        assert_eq!(err.kind(), "unknown_method");
    }
}
