//! Record store seam

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::domain::Domain;
use crate::core::error::StoreError;
use crate::core::field::{Record, RecordId};
use crate::core::schema::ModelDescriptor;

pub type StoreResult<T> = Result<T, StoreError>;

/// Generic search/read/create/write/delete over named collections
///
/// Every call is scoped to one model. Implementations always include `id`
/// in returned records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records matching every predicate of `filter`, projected on `fields`
    async fn search_read(
        &self,
        model: &ModelDescriptor,
        filter: &Domain,
        fields: &[String],
    ) -> StoreResult<Vec<Record>>;

    async fn exists(&self, model: &ModelDescriptor, id: RecordId) -> StoreResult<bool>;

    /// Insert a record and return its new id
    async fn create(
        &self,
        model: &ModelDescriptor,
        values: &Map<String, Value>,
    ) -> StoreResult<RecordId>;

    async fn write(
        &self,
        model: &ModelDescriptor,
        id: RecordId,
        values: &Map<String, Value>,
    ) -> StoreResult<()>;

    async fn unlink(&self, model: &ModelDescriptor, id: RecordId) -> StoreResult<()>;
}
