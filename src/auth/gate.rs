//! Authorization Gate
//!
//! Verifies the request token before any use case runs and hands the
//! resulting identity to the operation as a request-scoped context.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::OperationContext;

use super::{AuthError, TokenVerifier};

/// Gate in front of every protected operation
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    verifier: Arc<TokenVerifier>,
}

impl AuthorizationGate {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Verify `raw` and build the context for one request.
    pub fn authorize(
        &self,
        raw: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<OperationContext, AuthError> {
        let raw = raw
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let identity = self.verifier.verify(raw, now)?;
        Ok(OperationContext::new(identity))
    }

    /// Run `operation` only if the token verifies.
    ///
    /// On a verification failure the operation is never invoked.
    pub async fn run<T, E, F, Fut>(
        &self,
        raw: Option<&str>,
        now: DateTime<Utc>,
        correlation_id: Option<Uuid>,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce(OperationContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AuthError>,
    {
        let mut context = match self.authorize(raw, now) {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected request before dispatch");
                return Err(e.into());
            }
        };

        if let Some(correlation_id) = correlation_id {
            context = context.with_correlation_id(correlation_id);
        }

        operation(context).await
    }
}
