//! REST API exposure for the gateway
//!
//! Consumes a `GatewayHost` and produces an Axum `Router`:
//! - `GET /odoo_connect`: credential exchange
//! - `GET|POST|PUT|DELETE /send_request?model=..&Id=..`: CRUD pipeline
//! - `GET /health`, `GET /healthz`

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::super::host::{ErrorRendering, GatewayHost, GatewayRequest};
use crate::core::error::{ErrorFormat, GatewayError};

/// Header names read by the handlers
pub const API_KEY_HEADER: &str = "api-key";
pub const LOGIN_HEADER: &str = "login";
pub const PASSWORD_HEADER: &str = "password";
pub const DB_HEADER: &str = "db";

/// Query string of `/send_request`
#[derive(Debug, Default, Deserialize)]
pub struct SendRequestQuery {
    pub model: Option<String>,

    #[serde(rename = "Id")]
    pub id: Option<String>,
}

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    ///
    /// Custom routes are merged after the gateway routes.
    pub fn build_router(host: Arc<GatewayHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let gateway_routes = Router::new()
            .route("/odoo_connect", get(Self::connect))
            .route(
                "/send_request",
                get(Self::send_request)
                    .post(Self::send_request)
                    .put(Self::send_request)
                    .delete(Self::send_request),
            )
            .with_state(host);

        let mut app = Self::health_routes().merge(gateway_routes);

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "model-gateway"
        }))
    }

    /// GET /odoo_connect
    async fn connect(State(host): State<Arc<GatewayHost>>, headers: HeaderMap) -> Response {
        let outcome = host
            .connect(
                header_str(&headers, LOGIN_HEADER),
                header_str(&headers, PASSWORD_HEADER),
                header_str(&headers, DB_HEADER),
            )
            .await;

        match outcome {
            Ok(response) => Json(response).into_response(),
            Err(e) => render_error(host.errors, e),
        }
    }

    /// GET|POST|PUT|DELETE /send_request
    ///
    /// `login` and `password` headers are accepted but not used; the API key
    /// is the only per-request credential.
    async fn send_request(
        State(host): State<Arc<GatewayHost>>,
        method: Method,
        query: Result<Query<SendRequestQuery>, QueryRejection>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let query = match query {
            Ok(Query(query)) => query,
            Err(e) => {
                tracing::debug!(error = %e, "unreadable query string");
                SendRequestQuery::default()
            }
        };

        // A non-UTF-8 key counts as supplied but invalid
        let api_key = headers
            .get(API_KEY_HEADER)
            .map(|v| v.to_str().unwrap_or_default());

        let request = GatewayRequest {
            method: &method,
            api_key,
            model: query.model.as_deref(),
            record_id: query.id.as_deref(),
            body: &body,
        };

        match host.dispatch(request).await {
            Ok(envelope) => envelope.into_response(),
            Err(e) => {
                tracing::debug!(
                    method = %method,
                    model = query.model.as_deref().unwrap_or_default(),
                    code = e.error_code(),
                    "request rejected"
                );
                render_error(host.errors, e)
            }
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Render an error per the configured format and status policy
pub fn render_error(rendering: ErrorRendering, error: GatewayError) -> Response {
    let status = if rendering.legacy_status_codes {
        StatusCode::OK
    } else {
        error.status_code()
    };

    match rendering.format {
        ErrorFormat::Html => (
            status,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            error.to_html(),
        )
            .into_response(),
        ErrorFormat::Json => (status, Json(error.to_response())).into_response(),
    }
}
