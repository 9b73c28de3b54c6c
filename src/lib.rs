//! # Model Gateway
//!
//! A configuration-driven REST gateway exposing CRUD over named models.
//!
//! ## Features
//!
//! - **API keys**: login/password/database exchanged once for a durable key
//! - **Per-model permissions**: GET/POST/PUT/DELETE flags per exposed model
//! - **Domains**: `[field, operator, value]` filters, always pinned to the route id
//! - **Normalized output**: ISO-8601 dates, projection order preserved
//! - **Pluggable collaborators**: record store, identity, permissions and
//!   schema are traits with in-memory implementations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gateway::prelude::*;
//!
//! let config = GatewayConfig::from_yaml_file("gateway.yaml")?;
//! GatewayBuilder::in_memory(&config)?
//!     .serve(&config.server.bind)
//!     .await?;
//! ```
//!
//! ```text
//! GET /odoo_connect                      login, password, db headers
//! GET /send_request?model=res.partner&Id=42
//!     api-key: <key>
//!     {"fields": ["id", "name"]}
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        auth::{IdentityProvider, Principal, PrincipalStore},
        permission::PermissionSource,
        schema::SchemaRegistry,
        store::RecordStore,
    };

    // === Core Types ===
    pub use crate::core::{
        ApiKeyAuthenticator, AuthOutcome, ConnectResponse, CredentialExchange, CrudExecutor,
        Domain, EntityTypeConfig, ErrorFormat, FieldKind, FieldSpec, FieldValue, GatewayError,
        GatewayResult, ModelDescriptor, ModelId, ModelResolver, Operation, OperationKind,
        Operator, PermissionGate, Predicate, Record, RecordId, Rejection, RequestShape,
        ResponseEnvelope, StoreError,
    };

    // === Storage ===
    pub use crate::storage::{
        InMemoryIdentityProvider, InMemoryPermissionSource, InMemoryRecordStore,
    };

    // === Config ===
    pub use crate::config::{GatewayConfig, ModelConfig, SeedConfig};

    // === Server ===
    pub use crate::server::{
        ErrorRendering, GatewayBuilder, GatewayHost, GatewayRequest, ModelRegistry,
        RestExposure,
    };

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};

    // === Axum ===
    pub use axum::Router;
}
