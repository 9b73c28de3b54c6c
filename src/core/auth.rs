//! Authentication for the gateway
//!
//! Two flows live here:
//! - [`CredentialExchange`]: login + password + tenant → durable API key
//! - [`ApiKeyAuthenticator`]: per-request check of the `api-key` header
//!
//! Password verification itself belongs to an [`IdentityProvider`]; key
//! storage belongs to a [`PrincipalStore`]. Both are collaborators.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{GatewayError, GatewayResult};

/// Identifier of a principal inside the identity subsystem
pub type PrincipalId = u64;

/// An authenticated caller identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub login: String,
    /// Display name, returned as `User` by the credential exchange
    pub name: String,
    /// Tenant (database) the principal belongs to
    pub tenant: String,
}

/// Identity subsystem: turns credentials into a principal
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate a login/password pair within a tenant
    ///
    /// Any error means "not authenticated"; callers must not surface it.
    async fn authenticate(&self, tenant: &str, login: &str, password: &str) -> Result<Principal>;
}

/// Principal store: holds the single active API key of each principal
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Find the principal owning exactly this key
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Principal>>;

    /// Current key of a principal, if one was issued
    async fn api_key_of(&self, principal: PrincipalId) -> Result<Option<String>>;

    /// Replace the key of a principal; the previous key stops working
    async fn set_api_key(&self, principal: PrincipalId, api_key: &str) -> Result<()>;
}

/// Generate a fresh opaque key (32 lowercase hex characters)
pub fn generate_api_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Result of checking an `api-key` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Principal),
    Rejected(Rejection),
}

/// Why an API key was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No key header at all
    MissingKey,
    /// A key was supplied but matches no principal
    InvalidKey,
}

impl From<Rejection> for GatewayError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::MissingKey => GatewayError::MissingApiKey,
            Rejection::InvalidKey => GatewayError::InvalidApiKey,
        }
    }
}

impl AuthOutcome {
    pub fn into_result(self) -> GatewayResult<Principal> {
        match self {
            AuthOutcome::Authenticated(principal) => Ok(principal),
            AuthOutcome::Rejected(rejection) => Err(rejection.into()),
        }
    }
}

/// Validates API keys against the principal store (read-only)
#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    principals: Arc<dyn PrincipalStore>,
}

impl ApiKeyAuthenticator {
    pub fn new(principals: Arc<dyn PrincipalStore>) -> Self {
        Self { principals }
    }

    pub async fn authenticate(&self, api_key: Option<&str>) -> AuthOutcome {
        let Some(api_key) = api_key else {
            return AuthOutcome::Rejected(Rejection::MissingKey);
        };

        if api_key.is_empty() {
            return AuthOutcome::Rejected(Rejection::InvalidKey);
        }

        match self.principals.find_by_api_key(api_key).await {
            Ok(Some(principal)) => AuthOutcome::Authenticated(principal),
            Ok(None) => AuthOutcome::Rejected(Rejection::InvalidKey),
            Err(e) => {
                tracing::error!(error = %e, "principal lookup failed");
                AuthOutcome::Rejected(Rejection::InvalidKey)
            }
        }
    }
}

/// Successful credential exchange, serialized as the `/odoo_connect` body
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConnectResponse {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "api-key")]
    pub api_key: String,
}

/// Exchanges login credentials for a durable API key
#[derive(Clone)]
pub struct CredentialExchange {
    identity: Arc<dyn IdentityProvider>,
    principals: Arc<dyn PrincipalStore>,
    rotate_on_connect: bool,
}

impl CredentialExchange {
    pub fn new(identity: Arc<dyn IdentityProvider>, principals: Arc<dyn PrincipalStore>) -> Self {
        Self {
            identity,
            principals,
            rotate_on_connect: false,
        }
    }

    /// Issue a fresh key on every exchange instead of reusing the current one
    pub fn with_rotation(mut self, rotate: bool) -> Self {
        self.rotate_on_connect = rotate;
        self
    }

    /// Authenticate and return the principal's API key
    ///
    /// Every failure (missing header, identity error, key storage error)
    /// collapses into [`GatewayError::WrongCredentials`].
    pub async fn connect(
        &self,
        login: Option<&str>,
        password: Option<&str>,
        tenant: Option<&str>,
    ) -> GatewayResult<ConnectResponse> {
        let (Some(login), Some(password), Some(tenant)) = (login, password, tenant) else {
            tracing::warn!("credential exchange rejected: missing header");
            return Err(GatewayError::WrongCredentials);
        };

        let principal = self
            .identity
            .authenticate(tenant, login, password)
            .await
            .map_err(|e| {
                tracing::warn!(login = %login, tenant = %tenant, error = %e, "credential exchange rejected");
                GatewayError::WrongCredentials
            })?;

        let api_key = self.issue_key(&principal).await.map_err(|e| {
            tracing::error!(login = %login, error = %e, "failed to issue api key");
            GatewayError::WrongCredentials
        })?;

        tracing::info!(login = %login, tenant = %tenant, "api key issued");

        Ok(ConnectResponse {
            status: "auth successful".to_string(),
            user: principal.name,
            api_key,
        })
    }

    /// Fetch the current key or create one (single active key per principal)
    async fn issue_key(&self, principal: &Principal) -> Result<String> {
        if !self.rotate_on_connect
            && let Some(existing) = self.principals.api_key_of(principal.id).await?
        {
            return Ok(existing);
        }

        let api_key = generate_api_key();
        self.principals.set_api_key(principal.id, &api_key).await?;
        Ok(api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct StubIdentity;

    #[async_trait]
    impl IdentityProvider for StubIdentity {
        async fn authenticate(&self, tenant: &str, login: &str, password: &str) -> Result<Principal> {
            if tenant == "main" && login == "admin" && password == "secret" {
                Ok(Principal {
                    id: 1,
                    login: "admin".into(),
                    name: "Administrator".into(),
                    tenant: "main".into(),
                })
            } else {
                Err(anyhow::anyhow!("Access Denied"))
            }
        }
    }

    #[derive(Default)]
    struct StubPrincipals {
        keys: RwLock<HashMap<PrincipalId, String>>,
    }

    #[async_trait]
    impl PrincipalStore for StubPrincipals {
        async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Principal>> {
            let keys = self.keys.read().unwrap();
            Ok(keys
                .iter()
                .find(|(_, k)| k.as_str() == api_key)
                .map(|(id, _)| Principal {
                    id: *id,
                    login: "admin".into(),
                    name: "Administrator".into(),
                    tenant: "main".into(),
                }))
        }

        async fn api_key_of(&self, principal: PrincipalId) -> Result<Option<String>> {
            Ok(self.keys.read().unwrap().get(&principal).cloned())
        }

        async fn set_api_key(&self, principal: PrincipalId, api_key: &str) -> Result<()> {
            self.keys
                .write()
                .unwrap()
                .insert(principal, api_key.to_string());
            Ok(())
        }
    }

    fn exchange() -> (CredentialExchange, ApiKeyAuthenticator) {
        let principals: Arc<dyn PrincipalStore> = Arc::new(StubPrincipals::default());
        (
            CredentialExchange::new(Arc::new(StubIdentity), principals.clone()),
            ApiKeyAuthenticator::new(principals),
        )
    }

    #[test]
    fn test_generated_key_shape() {
        let key = generate_api_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(key, generate_api_key());
    }

    #[tokio::test]
    async fn test_issued_key_authenticates() {
        let (exchange, authenticator) = exchange();
        let response = exchange
            .connect(Some("admin"), Some("secret"), Some("main"))
            .await
            .expect("connect should succeed");

        assert_eq!(response.status, "auth successful");
        assert_eq!(response.user, "Administrator");
        assert!(!response.api_key.is_empty());

        let outcome = authenticator.authenticate(Some(&response.api_key)).await;
        assert!(matches!(outcome, AuthOutcome::Authenticated(p) if p.id == 1));
    }

    #[tokio::test]
    async fn test_connect_reuses_existing_key() {
        let (exchange, _) = exchange();
        let first = exchange
            .connect(Some("admin"), Some("secret"), Some("main"))
            .await
            .unwrap();
        let second = exchange
            .connect(Some("admin"), Some("secret"), Some("main"))
            .await
            .unwrap();
        assert_eq!(first.api_key, second.api_key);
    }

    #[tokio::test]
    async fn test_rotation_invalidates_previous_key() {
        let (exchange, authenticator) = exchange();
        let exchange = exchange.with_rotation(true);
        let first = exchange
            .connect(Some("admin"), Some("secret"), Some("main"))
            .await
            .unwrap();
        let second = exchange
            .connect(Some("admin"), Some("secret"), Some("main"))
            .await
            .unwrap();

        assert_ne!(first.api_key, second.api_key);
        assert_eq!(
            authenticator.authenticate(Some(&first.api_key)).await,
            AuthOutcome::Rejected(Rejection::InvalidKey)
        );
    }

    #[tokio::test]
    async fn test_failures_collapse_into_one_message() {
        let (exchange, _) = exchange();
        let wrong_password = exchange
            .connect(Some("admin"), Some("nope"), Some("main"))
            .await
            .unwrap_err();
        let wrong_db = exchange
            .connect(Some("admin"), Some("secret"), Some("other"))
            .await
            .unwrap_err();
        let missing = exchange.connect(Some("admin"), None, Some("main")).await.unwrap_err();

        for err in [wrong_password, wrong_db, missing] {
            assert!(matches!(err, GatewayError::WrongCredentials));
            assert_eq!(err.to_string(), "wrong login credentials");
        }
    }

    #[tokio::test]
    async fn test_missing_and_invalid_keys_are_distinct() {
        let (_, authenticator) = exchange();
        assert_eq!(
            authenticator.authenticate(None).await,
            AuthOutcome::Rejected(Rejection::MissingKey)
        );
        assert_eq!(
            authenticator.authenticate(Some("")).await,
            AuthOutcome::Rejected(Rejection::InvalidKey)
        );
        assert_eq!(
            authenticator.authenticate(Some("deadbeef")).await,
            AuthOutcome::Rejected(Rejection::InvalidKey)
        );
    }
}
