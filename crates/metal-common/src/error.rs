//! Error types for the Equinix Metal extension
//!
//! Errors carry enough context to tell the three failure classes apart:
//! retryable infrastructure hiccups, cycle-fatal cloud API failures, and
//! inventory problems that need an administrator rather than a retry.

use thiserror::Error;

/// Main error type for extension operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Cloud device API error
    #[error("cloud api error for device {device_id}: {message}")]
    CloudApi {
        /// The device whose lookup failed
        device_id: String,
        /// Description of what failed
        message: String,
    },

    /// Device inventory is incomplete: a private management interface exists
    /// but its parent block is missing network or prefix information. Waiting
    /// does not fix this; the underlying inventory must be corrected.
    #[error("incomplete inventory for device {device_id}: {message}")]
    Inventory {
        /// The device with broken inventory data
        device_id: String,
        /// Description of what is missing
        message: String,
    },

    /// A providerID string that cannot be split into scheme and device id
    #[error("malformed providerID: {message}")]
    ProviderId {
        /// Description of the malformed input
        message: String,
    },

    /// Cloud provider credentials missing or unusable
    #[error("credentials error: {message}")]
    Credentials {
        /// Description of what is wrong with the secret
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Context where the error occurred (e.g., "status", "vpn")
        context: String,
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a cloud API error for a device lookup
    pub fn cloud_api(device_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::CloudApi {
            device_id: device_id.into(),
            message: msg.into(),
        }
    }

    /// Create an inventory error for a device with incomplete network data
    pub fn inventory(device_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Inventory {
            device_id: device_id.into(),
            message: msg.into(),
        }
    }

    /// Create a providerID format error
    pub fn provider_id(msg: impl Into<String>) -> Self {
        Self::ProviderId {
            message: msg.into(),
        }
    }

    /// Create a credentials error
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials {
            message: msg.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Inventory and providerID errors require external remediation and must
    /// not be retried on a timer. Kubernetes errors depend on the status
    /// code: conflicts retry, other 4xx responses do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) if ae.code == 409 => true,
                kube::Error::Api(ae) if (400..500).contains(&ae.code) => false,
                _ => true,
            },
            Error::CloudApi { .. } => true,
            Error::Inventory { .. } => false,
            Error::ProviderId { .. } => false,
            Error::Credentials { .. } => true,
            Error::Serialization { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Check if this error is a Kubernetes optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::Kube {
                source: kube::Error::Api(ae)
            } if ae.code == 409
        )
    }
}
