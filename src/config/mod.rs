//! Configuration loading and management

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

use crate::core::error::{ConfigError, ErrorFormat};
use crate::core::field::MAX_RECORD_ID;
use crate::core::permission::EntityTypeConfig;
use crate::core::schema::FieldSpec;

pub const DEFAULT_BIND: &str = "127.0.0.1:8069";

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub error_format: ErrorFormat,

    /// Send every error with status 200
    #[serde(default)]
    pub legacy_status_codes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            error_format: ErrorFormat::default(),
            legacy_status_codes: false,
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub rotate_key_on_connect: bool,
}

/// A model registered in the schema registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Technical name (e.g., "res.partner")
    pub name: String,

    #[serde(default = "default_module")]
    pub module: String,

    #[serde(default = "default_true")]
    pub installed: bool,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

fn default_module() -> String {
    "base".to_string()
}

fn default_true() -> bool {
    true
}

/// A principal seeded into the in-memory identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalSeed {
    pub login: String,
    pub name: String,
    pub password: String,
    pub database: String,
}

/// Seed data for the in-memory collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub databases: Vec<String>,

    #[serde(default)]
    pub principals: Vec<PrincipalSeed>,

    /// First record id handed out by the in-memory store
    #[serde(default = "default_sequence_start")]
    pub sequence_start: u64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            databases: Vec::new(),
            principals: Vec::new(),
            sequence_start: default_sequence_start(),
        }
    }
}

fn default_sequence_start() -> u64 {
    1
}

/// Complete gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub models: Vec<ModelConfig>,

    /// Permission records, one per exposed model
    #[serde(default)]
    pub exposed: Vec<EntityTypeConfig>,

    #[serde(default)]
    pub seed: SeedConfig,
}

impl GatewayConfig {
    /// Load and validate configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load and validate configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check uniqueness and cross-references
    ///
    /// `exposed` entries naming unregistered models are accepted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = self.server.bind.parse::<SocketAddr>() {
            return Err(ConfigError::InvalidValue {
                field: "server.bind".into(),
                value: self.server.bind.clone(),
                message: e.to_string(),
            });
        }

        if !(1..=MAX_RECORD_ID).contains(&self.seed.sequence_start) {
            return Err(ConfigError::InvalidValue {
                field: "seed.sequence_start".into(),
                value: self.seed.sequence_start.to_string(),
                message: format!("record ids range from 1 to {}", MAX_RECORD_ID),
            });
        }

        ensure_unique("exposed model", self.exposed.iter().map(|e| e.model_name.as_str()))?;
        ensure_unique("model", self.models.iter().map(|m| m.name.as_str()))?;
        for model in &self.models {
            ensure_unique(
                "field",
                model.fields.iter().map(|f| f.name.as_str()),
            )
            .map_err(|e| match e {
                ConfigError::Duplicate { kind, name } => ConfigError::Duplicate {
                    kind,
                    name: format!("{}.{}", model.name, name),
                },
                other => other,
            })?;
        }

        ensure_unique("database", self.seed.databases.iter().map(String::as_str))?;
        ensure_unique(
            "principal login",
            self.seed.principals.iter().map(|p| p.login.as_str()),
        )?;
        for principal in &self.seed.principals {
            if !self.seed.databases.contains(&principal.database) {
                return Err(ConfigError::InvalidValue {
                    field: format!("seed.principals[{}].database", principal.login),
                    value: principal.database.clone(),
                    message: "database is not listed in seed.databases".into(),
                });
            }
        }

        Ok(())
    }
}

fn ensure_unique<'a>(
    kind: &'static str,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::Duplicate {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
