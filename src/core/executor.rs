//! Executes one [`Operation`] against the record store

use std::sync::Arc;

use crate::core::domain::Domain;
use crate::core::error::{GatewayError, GatewayResult, StoreError};
use crate::core::field::{Record, RecordId};
use crate::core::operation::Operation;
use crate::core::response::ResponseEnvelope;
use crate::core::schema::ModelDescriptor;
use crate::core::store::RecordStore;

/// Fields returned in the delete receipt
const RECEIPT_FIELDS: [&str; 2] = ["id", "display_name"];

/// Maps operations to record store calls for a single resolved model
#[derive(Clone)]
pub struct CrudExecutor {
    store: Arc<dyn RecordStore>,
}

impl CrudExecutor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Run the operation and return the formatted envelope
    pub async fn execute(
        &self,
        model: &ModelDescriptor,
        operation: Operation,
    ) -> GatewayResult<ResponseEnvelope> {
        let projection = operation.projection().to_vec();

        let envelope = match operation {
            Operation::Read { filter, fields } => {
                let records = self
                    .store
                    .search_read(model, &filter, &fields)
                    .await
                    .map_err(|e| store_failure(model, "read", e))?;
                ResponseEnvelope::Records(records)
            }
            Operation::Create { values, fields } => {
                let id = self
                    .store
                    .create(model, &values)
                    .await
                    .map_err(|e| store_failure(model, "create", e))?;
                tracing::debug!(model = %model.name, id, "record created");

                if fields.is_empty() {
                    ResponseEnvelope::NewResourceId(id)
                } else {
                    ResponseEnvelope::NewResource(self.reread(model, id, &fields, "create").await?)
                }
            }
            Operation::Update { id, values, fields } => {
                self.store
                    .write(model, id, &values)
                    .await
                    .map_err(|e| store_failure(model, "update", e))?;
                tracing::debug!(model = %model.name, id, "record updated");

                if fields.is_empty() {
                    ResponseEnvelope::UpdatedResourceId(id)
                } else {
                    ResponseEnvelope::UpdatedResource(
                        self.reread(model, id, &fields, "update").await?,
                    )
                }
            }
            Operation::Delete { id } => {
                self.ensure_exists(model, id, "delete").await?;
                let receipt_fields: Vec<String> =
                    RECEIPT_FIELDS.iter().map(|f| f.to_string()).collect();
                let receipt = self.reread(model, id, &receipt_fields, "delete").await?;
                self.store
                    .unlink(model, id)
                    .await
                    .map_err(|e| store_failure(model, "delete", e))?;
                tracing::debug!(model = %model.name, id, "record deleted");
                ResponseEnvelope::ResourceDeleted(receipt)
            }
        };

        Ok(envelope.formatted(&projection))
    }

    /// `NotFound` unless the record exists
    ///
    /// Updates are checked by the caller before the body is decoded.
    pub async fn ensure_exists(
        &self,
        model: &ModelDescriptor,
        id: RecordId,
        op: &'static str,
    ) -> GatewayResult<()> {
        let exists = self
            .store
            .exists(model, id)
            .await
            .map_err(|e| store_failure(model, op, e))?;

        if exists {
            Ok(())
        } else {
            Err(GatewayError::NotFound)
        }
    }

    async fn reread(
        &self,
        model: &ModelDescriptor,
        id: RecordId,
        fields: &[String],
        op: &'static str,
    ) -> GatewayResult<Vec<Record>> {
        self.store
            .search_read(model, &Domain::by_id(id), fields)
            .await
            .map_err(|e| store_failure(model, op, e))
    }
}

fn store_failure(model: &ModelDescriptor, op: &'static str, error: StoreError) -> GatewayError {
    tracing::error!(model = %model.name, operation = op, error = %error, "record store call failed");
    GatewayError::Store(error)
}
