//! Server host for transport-agnostic request dispatch
//!
//! `GatewayHost` owns every pipeline stage and runs them in order:
//! API key → model → permission → translation → execution. Transports
//! (the REST exposure) only extract raw inputs and render the outcome.

use axum::http::Method;

use crate::core::auth::{ApiKeyAuthenticator, ConnectResponse, CredentialExchange};
use crate::core::error::{ErrorFormat, GatewayError, GatewayResult};
use crate::core::executor::CrudExecutor;
use crate::core::operation::{OperationKind, RequestShape, parse_record_id};
use crate::core::permission::PermissionGate;
use crate::core::response::ResponseEnvelope;
use crate::core::schema::ModelResolver;

/// Raw inputs of one `/send_request` call
#[derive(Debug, Clone, Copy)]
pub struct GatewayRequest<'a> {
    pub method: &'a Method,
    pub api_key: Option<&'a str>,
    pub model: Option<&'a str>,
    pub record_id: Option<&'a str>,
    pub body: &'a [u8],
}

/// How errors leave the gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorRendering {
    pub format: ErrorFormat,
    /// Send every error with status 200
    pub legacy_status_codes: bool,
}

/// Host context containing all gateway state
///
/// Holds only shared collaborators and read-mostly settings; one
/// `Arc<GatewayHost>` serves all concurrent requests.
pub struct GatewayHost {
    pub authenticator: ApiKeyAuthenticator,
    pub exchange: CredentialExchange,
    pub resolver: ModelResolver,
    pub gate: PermissionGate,
    pub executor: CrudExecutor,
    pub errors: ErrorRendering,
}

impl GatewayHost {
    /// Credential exchange (`/odoo_connect`)
    pub async fn connect(
        &self,
        login: Option<&str>,
        password: Option<&str>,
        tenant: Option<&str>,
    ) -> GatewayResult<ConnectResponse> {
        self.exchange.connect(login, password, tenant).await
    }

    /// Run the full CRUD pipeline for one request
    pub async fn dispatch(&self, request: GatewayRequest<'_>) -> GatewayResult<ResponseEnvelope> {
        let principal = self
            .authenticator
            .authenticate(request.api_key)
            .await
            .into_result()?;

        let model = self.resolver.resolve(request.model)?;

        let shape = RequestShape::classify(request.method, request.body).ok_or(
            GatewayError::MethodNotAllowed {
                kind: OperationKind::Read,
            },
        )?;
        self.gate.check(&model, &shape).await?;

        let record_id = parse_record_id(request.record_id)?;
        if let (Some(OperationKind::Update), Some(id)) = (shape.kind(), record_id) {
            self.executor.ensure_exists(&model, id, "update").await?;
        }
        let operation = shape.into_operation(record_id)?;

        tracing::debug!(
            model = %model.name,
            method = %request.method,
            login = %principal.login,
            ?operation,
            "dispatching operation"
        );

        self.executor.execute(&model, operation).await
    }
}
