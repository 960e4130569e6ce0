use std::fmt;

use crate::types::EndpointId;

/// Errors returned when an endpoint registration is rejected.
///
/// A rejected registration never touches the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// URL does not parse, or parses without a host.
    InvalidUrl {
        url: String,
        reason: String,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::InvalidUrl { url, reason } =>
                write!(f, "invalid webhook url {:?}: {}", url, reason),
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Errors returned by operator diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticsError {
    /// No endpoint is registered under this id.
    EndpointNotFound {
        endpoint_id: EndpointId,
    },
}

impl fmt::Display for DiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticsError::EndpointNotFound { endpoint_id } =>
                write!(f, "endpoint not found: {}", endpoint_id),
        }
    }
}

impl std::error::Error for DiagnosticsError {}

/// Reasons why a single HTTP delivery attempt failed.
///
/// These never escape `dispatch`; they are logged and folded into the
/// per-endpoint result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// No response within the endpoint timeout.
    Timeout,

    /// Connection could not be established.
    Connection(String),

    /// Receiver answered with something other than 200.
    Status(u16),

    /// Anything else raised while building or sending the request.
    Unexpected(String),
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryFailure::Timeout =>
                write!(f, "request timed out"),
            DeliveryFailure::Connection(message) =>
                write!(f, "connection error: {}", message),
            DeliveryFailure::Status(status) =>
                write!(f, "receiver returned status {}", status),
            DeliveryFailure::Unexpected(message) =>
                write!(f, "unexpected error: {}", message),
        }
    }
}

impl std::error::Error for DeliveryFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = RegistrationError::InvalidUrl {
            url: "not a url".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert!(err.to_string().contains("not a url"));

        let err = DiagnosticsError::EndpointNotFound {
            endpoint_id: EndpointId::from("ep9"),
        };
        assert_eq!(err.to_string(), "endpoint not found: ep9");

        assert_eq!(
            DeliveryFailure::Status(204).to_string(),
            "receiver returned status 204"
        );
    }
}
