//! Authenticated user resource client.

use std::sync::Arc;

use crate::capability::CapabilitySet;
use crate::error::Error;
use crate::transport::HttpTransport;
use crate::types::CurrentUser;

/// Client for the authenticated user.
pub struct UsersClient {
    transport: Arc<HttpTransport>,
}

impl UsersClient {
    /// Create a new users client.
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// Get the authenticated user and the scopes its token carries.
    ///
    /// Scopes come from the `X-OAuth-Scopes` header; tokens that do not
    /// send it yield `CapabilitySet::Unknown`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Authentication` if the token is rejected.
    pub async fn current(&self) -> Result<(CurrentUser, CapabilitySet), Error> {
        let (user, headers) = self.transport.get_with_headers::<CurrentUser>("user").await?;
        let scopes = CapabilitySet::from_header(
            headers.get("x-oauth-scopes").and_then(|v| v.to_str().ok()),
        );
        Ok((user, scopes))
    }
}
