//! Core module containing the request pipeline stages and collaborator traits

pub mod auth;
pub mod domain;
pub mod error;
pub mod executor;
pub mod field;
pub mod operation;
pub mod permission;
pub mod response;
pub mod schema;
pub mod store;

pub use auth::{
    ApiKeyAuthenticator, AuthOutcome, ConnectResponse, CredentialExchange, IdentityProvider,
    Principal, PrincipalId, PrincipalStore, Rejection,
};
pub use domain::{Domain, Operator, Predicate};
pub use error::{ConfigError, ErrorFormat, GatewayError, GatewayResult, StoreError};
pub use executor::CrudExecutor;
pub use field::{FieldValue, Record, RecordId};
pub use operation::{Operation, OperationKind, RequestBody, RequestShape};
pub use permission::{EntityTypeConfig, PermissionGate, PermissionSource};
pub use response::ResponseEnvelope;
pub use schema::{FieldKind, FieldSpec, ModelDescriptor, ModelId, ModelResolver, SchemaRegistry};
pub use store::{RecordStore, StoreResult};
