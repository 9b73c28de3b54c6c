//! Model descriptors and the schema registry seam

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::core::error::{GatewayError, GatewayResult};

/// Internal numeric identifier of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub u32);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Char,
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
    Many2one,
    Selection,
    Json,
}

impl FieldKind {
    pub fn is_temporal(&self) -> bool {
        matches!(self, FieldKind::Date | FieldKind::Datetime)
    }
}

/// A declared field of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Implicit fields present on every model
pub const IMPLICIT_FIELDS: [&str; 2] = ["id", "display_name"];

/// What the schema registry knows about one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub id: ModelId,
    /// Technical name, e.g. `res.partner`
    pub name: String,
    /// Owning module
    pub module: String,
    pub installed: bool,
    /// Declared fields in declaration order (implicit fields excluded)
    pub fields: Vec<FieldSpec>,
}

impl ModelDescriptor {
    /// Look up a declared field
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is a declared or implicit field
    pub fn has_field(&self, name: &str) -> bool {
        IMPLICIT_FIELDS.contains(&name) || self.field(name).is_some()
    }
}

/// Resolves model names to descriptors
///
/// Implementations return `None` for unknown names. Callers decide what an
/// uninstalled module means.
pub trait SchemaRegistry: Send + Sync {
    fn resolve(&self, name: &str) -> Option<ModelDescriptor>;
}

/// Maps the caller-supplied `model` parameter to an installed model
#[derive(Clone)]
pub struct ModelResolver {
    registry: Arc<dyn SchemaRegistry>,
}

impl ModelResolver {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, name: Option<&str>) -> GatewayResult<ModelDescriptor> {
        let name = name.map(str::trim).unwrap_or_default();
        let unknown = || GatewayError::UnknownModel {
            model: name.to_string(),
        };

        if name.is_empty() {
            return Err(unknown());
        }

        match self.registry.resolve(name) {
            Some(model) if model.installed => Ok(model),
            Some(model) => {
                tracing::debug!(model = %name, module = %model.module, "module not installed");
                Err(unknown())
            }
            None => Err(unknown()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticRegistry(HashMap<String, ModelDescriptor>);

    impl SchemaRegistry for StaticRegistry {
        fn resolve(&self, name: &str) -> Option<ModelDescriptor> {
            self.0.get(name).cloned()
        }
    }

    fn resolver() -> ModelResolver {
        let mut sale = partner();
        sale.id = ModelId(2);
        sale.name = "sale.order".into();
        sale.module = "sale".into();
        sale.installed = false;

        let map = [partner(), sale]
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();
        ModelResolver::new(Arc::new(StaticRegistry(map)))
    }

    fn partner() -> ModelDescriptor {
        ModelDescriptor {
            id: ModelId(1),
            name: "res.partner".into(),
            module: "base".into(),
            installed: true,
            fields: vec![
                FieldSpec::new("name", FieldKind::Char),
                FieldSpec::new("birthday", FieldKind::Date),
            ],
        }
    }

    #[test]
    fn test_implicit_fields_are_known() {
        let model = partner();
        assert!(model.has_field("id"));
        assert!(model.has_field("display_name"));
        assert!(model.field("id").is_none());
    }

    #[test]
    fn test_declared_fields() {
        let model = partner();
        assert_eq!(model.field("birthday").map(|f| f.kind), Some(FieldKind::Date));
        assert!(!model.has_field("email"));
    }

    #[test]
    fn test_resolve_installed_model() {
        let model = resolver().resolve(Some("res.partner")).unwrap();
        assert_eq!(model.id, ModelId(1));
    }

    #[test]
    fn test_unknown_missing_and_uninstalled_look_the_same() {
        let resolver = resolver();
        for name in [None, Some(""), Some("res.partnr"), Some("sale.order")] {
            let err = resolver.resolve(name).unwrap_err();
            assert!(matches!(err, GatewayError::UnknownModel { .. }));
        }
    }

    #[test]
    fn test_field_kind_from_yaml() {
        let spec: FieldSpec = serde_yaml::from_str("{ name: when, kind: datetime }").unwrap();
        assert_eq!(spec.kind, FieldKind::Datetime);
        assert!(spec.kind.is_temporal());
        assert!(serde_yaml::from_str::<FieldSpec>("{ name: x, kind: blob }").is_err());
    }
}
