//! Error types for fabric reconciliation.
//!
//! All errors implement `std::error::Error` via `thiserror`. Validation
//! errors (`HostNotConfigured`, `MissingRequiredFields`) are raised before
//! any store mutation or switch command for the offending event.

use thiserror::Error;

/// Result type alias for fabric operations.
pub type FabricResult<T> = Result<T, FabricError>;

/// Errors that can occur during binding reconciliation.
#[derive(Debug, Error)]
pub enum FabricError {
    /// The host has no switch/interface entry in the topology.
    #[error("Host '{host}' is not configured on any fabric switch")]
    HostNotConfigured {
        /// The host identifier that failed resolution.
        host: String,
    },

    /// One or more required port fields are absent.
    #[error("Missing required port fields: {fields}")]
    MissingRequiredFields {
        /// Space-separated missing field names, in validation order.
        fields: String,
    },

    /// Expected binding row absent on a delete-path lookup.
    ///
    /// The reconciler treats this as "already converged" internally; it is
    /// never surfaced to callers of the event entry points.
    #[error("Binding not found: {description}")]
    BindingNotFound {
        /// What was looked up.
        description: String,
    },

    /// A switch transport command failed.
    #[error("Transport command failed on switch '{switch}': {message}")]
    Transport {
        /// The switch the command was addressed to.
        switch: String,
        /// Error message from the transport.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl FabricError {
    /// Creates a host-not-configured error.
    pub fn host_not_configured(host: impl Into<String>) -> Self {
        Self::HostNotConfigured { host: host.into() }
    }

    /// Creates a missing-fields error from the absent field names.
    pub fn missing_fields(fields: &[&str]) -> Self {
        Self::MissingRequiredFields {
            fields: fields.join(" "),
        }
    }

    /// Creates a binding-not-found error.
    pub fn binding_not_found(description: impl Into<String>) -> Self {
        Self::BindingNotFound {
            description: description.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(switch: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            switch: switch.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient condition that may
    /// succeed on retry. Validation errors are permanent for a given event.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FabricError::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_not_configured_display() {
        let err = FabricError::host_not_configured("compute-12");
        assert_eq!(
            err.to_string(),
            "Host 'compute-12' is not configured on any fabric switch"
        );
    }

    #[test]
    fn test_missing_fields_ordering() {
        let err = FabricError::missing_fields(&["vlan_id", "host_id"]);
        assert_eq!(
            err.to_string(),
            "Missing required port fields: vlan_id host_id"
        );
    }

    #[test]
    fn test_transport_display() {
        let err = FabricError::transport("10.1.1.1", "connection refused");
        assert!(err.to_string().contains("10.1.1.1"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(FabricError::transport("s1", "timeout").is_retryable());
        assert!(!FabricError::host_not_configured("h1").is_retryable());
        assert!(!FabricError::missing_fields(&["vlan_id"]).is_retryable());
        assert!(!FabricError::binding_not_found("row").is_retryable());
    }
}
