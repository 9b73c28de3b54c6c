//! Typed errors for the gateway pipeline
//!
//! Every stage of the request pipeline returns `Result<_, GatewayError>`.
//! The variants are listed in the precedence order in which the pipeline
//! checks them: key, model, permission, request shape, backend store.
//!
//! Each error carries a fixed caller-facing message. Details (parser errors,
//! store failures) are logged where they occur and never returned.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::operation::OperationKind;

/// The main error type of the gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No <i>API Key</i> Provided !")]
    MissingApiKey,

    #[error("Invalid <i>API Key</i> !")]
    InvalidApiKey,

    #[error("Invalid model, check spelling or maybe the related module is not installed")]
    UnknownModel { model: String },

    #[error("No Record Created for the model")]
    ModelNotExposed { model: String },

    #[error("{}", method_not_allowed_message(.kind))]
    MethodNotAllowed { kind: OperationKind },

    #[error("Invalid ID")]
    InvalidId { value: String },

    #[error("Invalid JSON Data")]
    InvalidBody,

    #[error("No fields selected for the model")]
    MissingFields,

    #[error("No ID Provided")]
    MissingId,

    #[error("Resource not found")]
    NotFound,

    #[error("Invalid JSON Data")]
    Store(#[from] StoreError),

    #[error("wrong login credentials")]
    WrongCredentials,
}

fn method_not_allowed_message(kind: &OperationKind) -> &'static str {
    match kind {
        OperationKind::ReadViaPost => "Read (via POST) Not Allowed",
        OperationKind::Create => "Create (POST) Not Allowed",
        OperationKind::Read | OperationKind::Update | OperationKind::Delete => {
            "Method Not Allowed"
        }
    }
}

impl GatewayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingApiKey | GatewayError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            GatewayError::UnknownModel { .. } => StatusCode::NOT_FOUND,
            GatewayError::ModelNotExposed { .. } => StatusCode::FORBIDDEN,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::InvalidId { .. }
            | GatewayError::InvalidBody
            | GatewayError::MissingFields
            | GatewayError::MissingId => StatusCode::BAD_REQUEST,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Store(e) => e.status_code(),
            GatewayError::WrongCredentials => StatusCode::UNAUTHORIZED,
        }
    }

    /// Get the error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::MissingApiKey => "MISSING_API_KEY",
            GatewayError::InvalidApiKey => "INVALID_API_KEY",
            GatewayError::UnknownModel { .. } => "UNKNOWN_MODEL",
            GatewayError::ModelNotExposed { .. } => "MODEL_NOT_EXPOSED",
            GatewayError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            GatewayError::InvalidId { .. } => "INVALID_ID",
            GatewayError::InvalidBody => "INVALID_BODY",
            GatewayError::MissingFields => "MISSING_FIELDS",
            GatewayError::MissingId => "MISSING_ID",
            GatewayError::NotFound => "NOT_FOUND",
            GatewayError::Store(e) => e.error_code(),
            GatewayError::WrongCredentials => "WRONG_CREDENTIALS",
        }
    }

    /// Legacy HTML fragment carrying the message
    pub fn to_html(&self) -> String {
        let tag = match self {
            GatewayError::UnknownModel { .. } => "h3",
            _ => "h2",
        };
        format!("<html><body><{tag}>{}</{tag}></body></html>", self)
    }

    /// JSON error body
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.error_code().to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_html();
        (status, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response()
    }
}

/// JSON error body, used when the gateway runs with `error_format: json`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// How errors are rendered to callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorFormat {
    /// `<html><body><h2>message</h2></body></html>`
    #[default]
    Html,
    /// `{"error": "message", "code": "CODE"}`
    Json,
}

// =============================================================================
// Store Errors
// =============================================================================

/// Failures reported by a [`RecordStore`](crate::core::store::RecordStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the operation (unknown field, bad value, ...)
    #[error("{model}: {message}")]
    Rejected { model: String, message: String },

    /// The backend could not be reached
    #[error("record store unavailable: {message}")]
    Unavailable { message: String },

    #[error("record store internal error: {message}")]
    Internal { message: String },
}

impl StoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Rejected { .. } => StatusCode::BAD_REQUEST,
            StoreError::Unavailable { .. } | StoreError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Rejected { .. } => "STORE_REJECTED",
            _ => "STORE_FAILURE",
        }
    }

    pub fn rejected(model: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Rejected {
            model: model.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors detected while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("Invalid value '{value}' for '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },
}

/// A specialized Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
