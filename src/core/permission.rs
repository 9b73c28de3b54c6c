//! Per-model method permissions

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::error::{GatewayError, GatewayResult, StoreError};
use crate::core::operation::{OperationKind, RequestShape};
use crate::core::schema::ModelDescriptor;

/// Which methods a model exposes through the gateway
///
/// A model without a config is not exposed at all, which is distinct from
/// a config with every flag off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeConfig {
    pub model_name: String,

    #[serde(default)]
    pub allow_get: bool,

    #[serde(default)]
    pub allow_post: bool,

    #[serde(default)]
    pub allow_put: bool,

    #[serde(default)]
    pub allow_delete: bool,
}

impl EntityTypeConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Default::default()
        }
    }

    pub fn with_get(mut self) -> Self {
        self.allow_get = true;
        self
    }

    pub fn with_post(mut self) -> Self {
        self.allow_post = true;
        self
    }

    pub fn with_put(mut self) -> Self {
        self.allow_put = true;
        self
    }

    pub fn with_delete(mut self) -> Self {
        self.allow_delete = true;
        self
    }

    /// Flag governing an operation kind
    pub fn allows(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Read | OperationKind::ReadViaPost => self.allow_get,
            OperationKind::Create => self.allow_post,
            OperationKind::Update => self.allow_put,
            OperationKind::Delete => self.allow_delete,
        }
    }
}

/// Persistence of permission records
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// The unique config for a model, if any
    async fn find(&self, model_name: &str) -> Result<Option<EntityTypeConfig>>;
}

/// Checks the requested operation against the model's permission record
#[derive(Clone)]
pub struct PermissionGate {
    source: Arc<dyn PermissionSource>,
}

impl PermissionGate {
    pub fn new(source: Arc<dyn PermissionSource>) -> Self {
        Self { source }
    }

    pub async fn check(&self, model: &ModelDescriptor, shape: &RequestShape) -> GatewayResult<()> {
        let config = match self.source.find(&model.name).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                return Err(GatewayError::ModelNotExposed {
                    model: model.name.clone(),
                });
            }
            Err(e) => {
                tracing::error!(model = %model.name, error = %e, "permission lookup failed");
                return Err(StoreError::Unavailable {
                    message: e.to_string(),
                }
                .into());
            }
        };

        let allowed = match shape.kind() {
            Some(kind) => config.allows(kind),
            // Unparseable POST: reject outright only if neither POST reading is open
            None => config.allow_get || config.allow_post,
        };

        if !allowed {
            let kind = shape.kind().unwrap_or(OperationKind::Create);
            tracing::debug!(model = %model.name, kind = %kind, "operation denied");
            return Err(GatewayError::MethodNotAllowed { kind });
        }

        Ok(())
    }
}
