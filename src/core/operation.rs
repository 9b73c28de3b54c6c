//! Request translation: HTTP method + route id + JSON body → [`Operation`]
//!
//! Translation runs in two steps so the permission gate can sit between them:
//!
//! 1. [`RequestShape::classify`] parses the body once and decides the
//!    [`OperationKind`] (this is where the overloaded POST is resolved).
//! 2. [`RequestShape::into_operation`] validates the shape for that kind and
//!    builds the [`Operation`], pinning the filter to the route id.

use axum::http::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::core::domain::Domain;
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::field::RecordId;

/// Kind of operation a request maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// GET
    Read,
    /// POST without a `values` key
    ReadViaPost,
    /// POST with a `values` key
    Create,
    /// PUT
    Update,
    /// DELETE
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Read => "read",
            OperationKind::ReadViaPost => "read_via_post",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// JSON request body accepted by `/send_request`
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub fields: Option<Vec<String>>,

    #[serde(default)]
    pub domain: Option<Domain>,

    /// `Some` whenever the key is present, `null` included
    #[serde(default, deserialize_with = "present")]
    pub values: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Write payload: `values` must be a JSON object
fn write_values(values: Option<Value>) -> GatewayResult<Map<String, Value>> {
    match values {
        Some(Value::Object(values)) => Ok(values),
        _ => Err(GatewayError::InvalidBody),
    }
}

impl RequestBody {
    /// Parse raw body bytes; an empty (or whitespace-only) body is `None`
    pub fn parse(bytes: &[u8]) -> Result<Option<Self>, serde_json::Error> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(bytes).map(Some)
    }
}

/// A structured operation against one model
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Read {
        filter: Domain,
        fields: Vec<String>,
    },
    Create {
        values: Map<String, Value>,
        fields: Vec<String>,
    },
    Update {
        id: RecordId,
        values: Map<String, Value>,
        fields: Vec<String>,
    },
    Delete {
        id: RecordId,
    },
}

impl Operation {
    /// Fields the caller asked to project, in request order
    pub fn projection(&self) -> &[String] {
        match self {
            Operation::Read { fields, .. }
            | Operation::Create { fields, .. }
            | Operation::Update { fields, .. } => fields,
            Operation::Delete { .. } => &[],
        }
    }
}

/// Parse the `Id` query parameter; absent, empty and `0` mean "not specified"
pub fn parse_record_id(raw: Option<&str>) -> GatewayResult<Option<RecordId>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<RecordId>() {
        Ok(0) => Ok(None),
        Ok(id) => Ok(Some(id)),
        Err(_) => Err(GatewayError::InvalidId {
            value: raw.to_string(),
        }),
    }
}

/// Outcome of parsing the request body
#[derive(Debug)]
pub enum Body {
    Empty,
    Parsed(RequestBody),
    /// Not valid JSON; reported only once the permission check has passed
    Invalid,
}

impl Body {
    fn from_bytes(bytes: &[u8]) -> Self {
        match RequestBody::parse(bytes) {
            Ok(None) => Body::Empty,
            Ok(Some(body)) => Body::Parsed(body),
            Err(e) => {
                tracing::debug!(error = %e, "request body is not valid JSON");
                Body::Invalid
            }
        }
    }

    /// Body for reads: an empty body counts as an empty object
    fn or_default(self) -> GatewayResult<RequestBody> {
        match self {
            Body::Empty => Ok(RequestBody::default()),
            Body::Parsed(body) => Ok(body),
            Body::Invalid => Err(GatewayError::InvalidBody),
        }
    }

    /// Body for writes: must be present and valid
    fn required(self) -> GatewayResult<RequestBody> {
        match self {
            Body::Parsed(body) => Ok(body),
            Body::Empty | Body::Invalid => Err(GatewayError::InvalidBody),
        }
    }
}

/// A classified request whose body has been parsed at most once
#[derive(Debug)]
pub enum RequestShape {
    Classified { kind: OperationKind, body: Body },
    /// POST whose body failed to parse: read or create cannot be told apart
    UnclassifiedPost,
}

impl RequestShape {
    /// Decide the operation kind from the method and (for POST) the body
    ///
    /// Returns `None` for methods the gateway does not route.
    pub fn classify(method: &Method, raw_body: &[u8]) -> Option<Self> {
        let shape = match *method {
            Method::GET => RequestShape::Classified {
                kind: OperationKind::Read,
                body: Body::from_bytes(raw_body),
            },
            Method::PUT => RequestShape::Classified {
                kind: OperationKind::Update,
                body: Body::from_bytes(raw_body),
            },
            Method::DELETE => RequestShape::Classified {
                kind: OperationKind::Delete,
                body: Body::Empty,
            },
            Method::POST => match Body::from_bytes(raw_body) {
                Body::Invalid => RequestShape::UnclassifiedPost,
                body => {
                    let has_values = matches!(&body, Body::Parsed(b) if b.values.is_some());
                    let kind = if has_values {
                        OperationKind::Create
                    } else {
                        OperationKind::ReadViaPost
                    };
                    RequestShape::Classified { kind, body }
                }
            },
            _ => return None,
        };

        Some(shape)
    }

    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            RequestShape::Classified { kind, .. } => Some(*kind),
            RequestShape::UnclassifiedPost => None,
        }
    }

    /// Validate the request shape for its kind and build the operation
    pub fn into_operation(self, record_id: Option<RecordId>) -> GatewayResult<Operation> {
        let (kind, body) = match self {
            RequestShape::Classified { kind, body } => (kind, body),
            RequestShape::UnclassifiedPost => return Err(GatewayError::InvalidBody),
        };

        match kind {
            OperationKind::Read | OperationKind::ReadViaPost => {
                let body = body.or_default()?;
                let fields = body.fields.unwrap_or_default();
                if fields.is_empty() {
                    return Err(GatewayError::MissingFields);
                }
                let mut filter = body.domain.unwrap_or_default();
                if let Some(id) = record_id {
                    filter = filter.pin_id(id);
                }
                Ok(Operation::Read { filter, fields })
            }
            OperationKind::Create => {
                let body = body.required()?;
                let values = write_values(body.values)?;
                Ok(Operation::Create {
                    values,
                    fields: body.fields.unwrap_or_default(),
                })
            }
            OperationKind::Update => {
                let id = record_id.ok_or(GatewayError::MissingId)?;
                let body = body.required()?;
                let values = write_values(body.values)?;
                Ok(Operation::Update {
                    id,
                    values,
                    fields: body.fields.unwrap_or_default(),
                })
            }
            OperationKind::Delete => {
                let id = record_id.ok_or(GatewayError::MissingId)?;
                Ok(Operation::Delete { id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{Operator, Predicate};
    use serde_json::json;

    fn classify(method: Method, body: Value) -> RequestShape {
        let bytes = serde_json::to_vec(&body).unwrap();
        RequestShape::classify(&method, &bytes).unwrap()
    }

    #[test]
    fn test_post_with_values_is_create() {
        let shape = classify(Method::POST, json!({"values": {"name": "Acme"}}));
        assert_eq!(shape.kind(), Some(OperationKind::Create));
    }

    #[test]
    fn test_post_without_values_is_read() {
        let shape = classify(Method::POST, json!({"fields": ["name"]}));
        assert_eq!(shape.kind(), Some(OperationKind::ReadViaPost));
    }

    #[test]
    fn test_post_with_null_values_is_create() {
        let shape = classify(Method::POST, json!({"values": null, "fields": ["name"]}));
        assert_eq!(shape.kind(), Some(OperationKind::Create));
        assert!(matches!(
            shape.into_operation(None),
            Err(GatewayError::InvalidBody)
        ));
    }

    #[test]
    fn test_post_with_empty_body_is_read() {
        let shape = RequestShape::classify(&Method::POST, b"").unwrap();
        assert_eq!(shape.kind(), Some(OperationKind::ReadViaPost));
        assert!(matches!(
            shape.into_operation(None),
            Err(GatewayError::MissingFields)
        ));
    }

    #[test]
    fn test_post_with_bad_json_is_unclassified() {
        let shape = RequestShape::classify(&Method::POST, b"{not json").unwrap();
        assert_eq!(shape.kind(), None);
        assert!(matches!(
            shape.into_operation(None),
            Err(GatewayError::InvalidBody)
        ));
    }

    #[test]
    fn test_unrouted_method() {
        assert!(RequestShape::classify(&Method::PATCH, b"").is_none());
    }

    #[test]
    fn test_read_requires_fields() {
        let shape = classify(Method::GET, json!({"domain": []}));
        assert!(matches!(
            shape.into_operation(None),
            Err(GatewayError::MissingFields)
        ));

        let shape = classify(Method::GET, json!({"fields": []}));
        assert!(matches!(
            shape.into_operation(None),
            Err(GatewayError::MissingFields)
        ));
    }

    #[test]
    fn test_get_with_empty_body_is_missing_fields() {
        let shape = RequestShape::classify(&Method::GET, b"").unwrap();
        assert!(matches!(
            shape.into_operation(None),
            Err(GatewayError::MissingFields)
        ));
    }

    #[test]
    fn test_get_with_bad_json_is_invalid_body() {
        let shape = RequestShape::classify(&Method::GET, b"[1,").unwrap();
        assert_eq!(shape.kind(), Some(OperationKind::Read));
        assert!(matches!(
            shape.into_operation(None),
            Err(GatewayError::InvalidBody)
        ));
    }

    #[test]
    fn test_read_pins_route_id() {
        let shape = classify(
            Method::GET,
            json!({"fields": ["id", "name"], "domain": [["id", ">", 0]]}),
        );
        let op = shape.into_operation(Some(42)).unwrap();
        match op {
            Operation::Read { filter, fields } => {
                assert_eq!(fields, vec!["id", "name"]);
                assert_eq!(filter.len(), 2);
                assert_eq!(filter.predicates()[0], Predicate::new("id", Operator::Gt, 0));
                assert_eq!(filter.predicates()[1], Predicate::id_eq(42));
            }
            other => panic!("Expected Read, got {:?}", other),
        }
    }

    #[test]
    fn test_create_keeps_projection() {
        let shape = classify(
            Method::POST,
            json!({"values": {"name": "Acme"}, "fields": ["id", "name"]}),
        );
        let op = shape.into_operation(None).unwrap();
        assert_eq!(op.projection(), ["id".to_string(), "name".to_string()]);
        assert!(matches!(op, Operation::Create { .. }));
    }

    #[test]
    fn test_create_values_must_be_object() {
        let bytes = serde_json::to_vec(&json!({"values": [1, 2]})).unwrap();
        let shape = RequestShape::classify(&Method::POST, &bytes).unwrap();
        assert!(matches!(
            shape.into_operation(None),
            Err(GatewayError::InvalidBody)
        ));
    }

    #[test]
    fn test_update_requires_id_before_body() {
        let shape = RequestShape::classify(&Method::PUT, b"garbage").unwrap();
        assert!(matches!(
            shape.into_operation(None),
            Err(GatewayError::MissingId)
        ));
    }

    #[test]
    fn test_update_requires_values() {
        let shape = classify(Method::PUT, json!({"fields": ["name"]}));
        assert!(matches!(
            shape.into_operation(Some(3)),
            Err(GatewayError::InvalidBody)
        ));

        let shape = classify(Method::PUT, json!({"values": {"name": "B"}}));
        let op = shape.into_operation(Some(3)).unwrap();
        assert!(matches!(op, Operation::Update { id: 3, .. }));
    }

    #[test]
    fn test_delete_ignores_body() {
        let shape = RequestShape::classify(&Method::DELETE, b"not json at all").unwrap();
        assert_eq!(
            shape.into_operation(Some(9)).unwrap(),
            Operation::Delete { id: 9 }
        );
    }

    #[test]
    fn test_delete_requires_id() {
        let shape = RequestShape::classify(&Method::DELETE, b"").unwrap();
        assert!(matches!(
            shape.into_operation(None),
            Err(GatewayError::MissingId)
        ));
    }

    #[test]
    fn test_parse_record_id() {
        assert_eq!(parse_record_id(None).unwrap(), None);
        assert_eq!(parse_record_id(Some("")).unwrap(), None);
        assert_eq!(parse_record_id(Some("0")).unwrap(), None);
        assert_eq!(parse_record_id(Some("42")).unwrap(), Some(42));
        assert!(matches!(
            parse_record_id(Some("-1")),
            Err(GatewayError::InvalidId { .. })
        ));
        assert!(matches!(
            parse_record_id(Some("abc")),
            Err(GatewayError::InvalidId { .. })
        ));
    }
}
