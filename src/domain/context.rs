//! Operation Context
//!
//! Request-scoped caller identity and tracing metadata. Built once per
//! request by the authorization gate and passed explicitly to every use case.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verified caller identity extracted from the request token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Owner identifier (IIN) the token was issued for
    pub subject_id: String,

    /// Whether the token grants administrative reads
    pub is_admin: bool,
}

impl Identity {
    pub fn new(subject_id: impl Into<String>, is_admin: bool) -> Self {
        Self {
            subject_id: subject_id.into(),
            is_admin,
        }
    }

    pub fn user(subject_id: impl Into<String>) -> Self {
        Self::new(subject_id, false)
    }

    pub fn admin(subject_id: impl Into<String>) -> Self {
        Self::new(subject_id, true)
    }
}

/// Context for an operation, used for authorization and tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    /// Caller identity
    pub identity: Identity,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl OperationContext {
    /// Create a context for a verified identity
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            correlation_id: None,
        }
    }

    /// Create context with correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }

    pub fn subject_id(&self) -> &str {
        &self.identity.subject_id
    }

    pub fn is_admin(&self) -> bool {
        self.identity.is_admin
    }
}
