//! GatewayBuilder for fluent API to build the HTTP server

use anyhow::{Result, anyhow};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::exposure::RestExposure;
use super::host::{ErrorRendering, GatewayHost};
use super::model_registry::ModelRegistry;
use crate::config::GatewayConfig;
use crate::core::auth::{ApiKeyAuthenticator, CredentialExchange, IdentityProvider, PrincipalStore};
use crate::core::executor::CrudExecutor;
use crate::core::permission::{PermissionGate, PermissionSource};
use crate::core::schema::{ModelResolver, SchemaRegistry};
use crate::core::store::RecordStore;
use crate::storage::{InMemoryIdentityProvider, InMemoryPermissionSource, InMemoryRecordStore};

/// Builder for the gateway server
///
/// # Example
///
/// ```ignore
/// let config = GatewayConfig::from_yaml_file("gateway.yaml")?;
/// GatewayBuilder::in_memory(&config)?
///     .serve(&config.server.bind)
///     .await?;
/// ```
pub struct GatewayBuilder {
    record_store: Option<Arc<dyn RecordStore>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    principals: Option<Arc<dyn PrincipalStore>>,
    permissions: Option<Arc<dyn PermissionSource>>,
    schema: Option<Arc<dyn SchemaRegistry>>,
    errors: ErrorRendering,
    rotate_key_on_connect: bool,
    custom_routes: Vec<Router>,
}

impl GatewayBuilder {
    /// Create a new GatewayBuilder
    pub fn new() -> Self {
        Self {
            record_store: None,
            identity: None,
            principals: None,
            permissions: None,
            schema: None,
            errors: ErrorRendering::default(),
            rotate_key_on_connect: false,
            custom_routes: Vec::new(),
        }
    }

    /// Builder wired to in-memory collaborators seeded from configuration
    pub fn in_memory(config: &GatewayConfig) -> Result<Self> {
        let identity = InMemoryIdentityProvider::from_seed(&config.seed)?;
        let registry = ModelRegistry::from_config(&config.models)?;

        tracing::info!(
            models = registry.len(),
            exposed = config.exposed.len(),
            principals = config.seed.principals.len(),
            "in-memory collaborators seeded"
        );

        Ok(Self::new()
            .with_settings(config)
            .with_record_store(InMemoryRecordStore::with_sequence_start(
                config.seed.sequence_start,
            ))
            .with_identity(identity)
            .with_permission_source(InMemoryPermissionSource::from_configs(
                config.exposed.clone(),
            ))
            .with_schema_registry(registry))
    }

    /// Apply server and auth settings from configuration
    pub fn with_settings(mut self, config: &GatewayConfig) -> Self {
        self.errors = ErrorRendering {
            format: config.server.error_format,
            legacy_status_codes: config.server.legacy_status_codes,
        };
        self.rotate_key_on_connect = config.auth.rotate_key_on_connect;
        self
    }

    /// Set the record store (required)
    pub fn with_record_store(mut self, store: impl RecordStore + 'static) -> Self {
        self.record_store = Some(Arc::new(store));
        self
    }

    /// Use one object as both identity provider and principal store
    pub fn with_identity<T>(mut self, identity: T) -> Self
    where
        T: IdentityProvider + PrincipalStore + 'static,
    {
        let identity = Arc::new(identity);
        self.identity = Some(identity.clone());
        self.principals = Some(identity);
        self
    }

    /// Set the identity provider (required)
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(provider);
        self
    }

    /// Set the principal store (required)
    pub fn with_principal_store(mut self, store: Arc<dyn PrincipalStore>) -> Self {
        self.principals = Some(store);
        self
    }

    /// Set the permission source (required)
    pub fn with_permission_source(mut self, source: impl PermissionSource + 'static) -> Self {
        self.permissions = Some(Arc::new(source));
        self
    }

    /// Set the schema registry (required)
    pub fn with_schema_registry(mut self, registry: impl SchemaRegistry + 'static) -> Self {
        self.schema = Some(Arc::new(registry));
        self
    }

    pub fn with_error_rendering(mut self, errors: ErrorRendering) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_key_rotation(mut self, rotate: bool) -> Self {
        self.rotate_key_on_connect = rotate;
        self
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    pub fn build_host(mut self) -> Result<GatewayHost> {
        let store = self
            .record_store
            .take()
            .ok_or_else(|| anyhow!("RecordStore is required. Call .with_record_store()"))?;
        let identity = self
            .identity
            .take()
            .ok_or_else(|| anyhow!("IdentityProvider is required. Call .with_identity()"))?;
        let principals = self
            .principals
            .take()
            .ok_or_else(|| anyhow!("PrincipalStore is required. Call .with_identity()"))?;
        let permissions = self.permissions.take().ok_or_else(|| {
            anyhow!("PermissionSource is required. Call .with_permission_source()")
        })?;
        let schema = self
            .schema
            .take()
            .ok_or_else(|| anyhow!("SchemaRegistry is required. Call .with_schema_registry()"))?;

        Ok(GatewayHost {
            authenticator: ApiKeyAuthenticator::new(principals.clone()),
            exchange: CredentialExchange::new(identity, principals)
                .with_rotation(self.rotate_key_on_connect),
            resolver: ModelResolver::new(schema),
            gate: PermissionGate::new(permissions),
            executor: CrudExecutor::new(store),
            errors: self.errors,
        })
    }

    /// Build the final REST router
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        RestExposure::build_router(host, custom_routes)
    }

    /// Serve the application with graceful shutdown
    ///
    /// Handles SIGTERM and SIGINT (Ctrl+C).
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Gateway listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Gateway shutdown complete");
        Ok(())
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorFormat;

    const CONFIG: &str = r#"
server:
  error_format: json
  legacy_status_codes: true
auth:
  rotate_key_on_connect: true
models:
  - name: res.partner
    fields:
      - { name: name, kind: char }
exposed:
  - model_name: res.partner
    allow_get: true
seed:
  databases: [main]
  principals:
    - { login: admin, name: Administrator, password: admin, database: main }
"#;

    fn config() -> GatewayConfig {
        GatewayConfig::from_yaml_str(CONFIG).expect("config should parse")
    }

    // ── Constructor tests ────────────────────────────────────────────────

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = GatewayBuilder::new();
        assert!(builder.record_store.is_none());
        assert!(builder.identity.is_none());
        assert!(builder.principals.is_none());
        assert!(builder.permissions.is_none());
        assert!(builder.schema.is_none());
        assert!(builder.custom_routes.is_empty());
    }

    #[test]
    fn test_default_is_same_as_new() {
        let builder = GatewayBuilder::default();
        assert!(builder.record_store.is_none());
        assert_eq!(builder.errors, ErrorRendering::default());
        assert!(!builder.rotate_key_on_connect);
    }

    // ── in_memory / with_settings ────────────────────────────────────────

    #[test]
    fn test_in_memory_wires_everything() {
        let builder = GatewayBuilder::in_memory(&config()).expect("in_memory should succeed");
        assert!(builder.record_store.is_some());
        assert!(builder.identity.is_some());
        assert!(builder.principals.is_some());
        assert!(builder.permissions.is_some());
        assert!(builder.schema.is_some());
        assert!(builder.rotate_key_on_connect);
        assert_eq!(builder.errors.format, ErrorFormat::Json);
        assert!(builder.errors.legacy_status_codes);
    }

    #[test]
    fn test_in_memory_host_resolves_models() {
        let host = GatewayBuilder::in_memory(&config())
            .unwrap()
            .build_host()
            .expect("host should build");
        assert!(host.resolver.resolve(Some("res.partner")).is_ok());
        assert!(host.resolver.resolve(Some("res.users")).is_err());
    }

    #[test]
    fn test_explicit_settings_override_config() {
        let rendering = ErrorRendering {
            format: ErrorFormat::Html,
            legacy_status_codes: false,
        };
        let builder = GatewayBuilder::in_memory(&config())
            .unwrap()
            .with_error_rendering(rendering)
            .with_key_rotation(false);
        assert!(!builder.rotate_key_on_connect);

        let host = builder.build_host().expect("host should build");
        assert_eq!(host.errors, rendering);
    }

    // ── build_host ───────────────────────────────────────────────────────

    #[test]
    fn test_build_host_without_record_store_fails() {
        let result = GatewayBuilder::new()
            .with_identity(InMemoryIdentityProvider::new())
            .with_permission_source(InMemoryPermissionSource::new())
            .with_schema_registry(ModelRegistry::new())
            .build_host();
        let err_msg = format!("{}", result.err().expect("should be Err"));
        assert!(
            err_msg.contains("RecordStore is required"),
            "error should mention RecordStore: {}",
            err_msg
        );
    }

    #[test]
    fn test_build_host_without_schema_fails() {
        let result = GatewayBuilder::new()
            .with_record_store(InMemoryRecordStore::new())
            .with_identity(InMemoryIdentityProvider::new())
            .with_permission_source(InMemoryPermissionSource::new())
            .build_host();
        assert!(result.is_err());
    }

    #[test]
    fn test_separate_identity_and_principal_store() {
        let identity = Arc::new(InMemoryIdentityProvider::new());
        let result = GatewayBuilder::new()
            .with_record_store(InMemoryRecordStore::new())
            .with_identity_provider(identity.clone())
            .with_principal_store(identity)
            .with_permission_source(InMemoryPermissionSource::new())
            .with_schema_registry(ModelRegistry::new())
            .build_host();
        assert!(result.is_ok());
    }

    // ── build (REST router) ──────────────────────────────────────────────

    #[test]
    fn test_build_with_custom_routes() {
        use axum::routing::get;

        let custom = Router::new().route("/custom", get(|| async { "ok" }));
        let router = GatewayBuilder::in_memory(&config())
            .unwrap()
            .with_custom_routes(custom)
            .build()
            .expect("build should succeed with custom routes");

        let _ = router;
    }

    #[test]
    fn test_in_memory_rejects_bad_seed() {
        let mut config = config();
        config.seed.principals[0].database = "other".into();
        assert!(GatewayBuilder::in_memory(&config).is_err());
    }
}
