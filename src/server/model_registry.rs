//! Model registry: the schema registry built once at startup

use anyhow::{Result, anyhow};
use std::collections::HashMap;

use crate::config::ModelConfig;
use crate::core::schema::{ModelDescriptor, ModelId, SchemaRegistry};

/// Registry for all models known to the gateway
///
/// Lookups are by technical name. Ids are assigned in registration order.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    descriptors: HashMap<String, ModelDescriptor>,
    next_id: u32,
}

impl ModelRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
            next_id: 0,
        }
    }

    /// Build the registry from configured models
    pub fn from_config(models: &[ModelConfig]) -> Result<Self> {
        let mut registry = Self::new();
        for model in models {
            registry.register(model.clone())?;
        }
        Ok(registry)
    }

    /// Register a model and return its id
    ///
    /// Registering the same name twice is an error.
    pub fn register(&mut self, model: ModelConfig) -> Result<ModelId> {
        if self.descriptors.contains_key(&model.name) {
            return Err(anyhow!("Model already registered: {}", model.name));
        }

        self.next_id += 1;
        let id = ModelId(self.next_id);
        tracing::debug!(model = %model.name, id = %id, installed = model.installed, "model registered");

        self.descriptors.insert(
            model.name.clone(),
            ModelDescriptor {
                id,
                name: model.name,
                module: model.module,
                installed: model.installed,
                fields: model.fields,
            },
        );

        Ok(id)
    }

    /// Get all registered model names
    pub fn model_names(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl SchemaRegistry for ModelRegistry {
    fn resolve(&self, name: &str) -> Option<ModelDescriptor> {
        self.descriptors.get(name).cloned()
    }
}
