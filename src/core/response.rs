//! Response envelope and record normalization

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::core::field::{Record, RecordId};

/// Successful response body
///
/// Serializes as a single-key object, e.g. `{"records": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResponseEnvelope {
    #[serde(rename = "records")]
    Records(Vec<Record>),

    #[serde(rename = "New resource")]
    NewResource(Vec<Record>),

    #[serde(rename = "New resource ID")]
    NewResourceId(RecordId),

    #[serde(rename = "Updated resource")]
    UpdatedResource(Vec<Record>),

    #[serde(rename = "Updated resource ID")]
    UpdatedResourceId(RecordId),

    #[serde(rename = "Resource deleted")]
    ResourceDeleted(Vec<Record>),
}

impl ResponseEnvelope {
    /// Normalize every record carried by the envelope
    pub fn formatted(self, projection: &[String]) -> Self {
        let format = |records: Vec<Record>| format_records(records, projection);
        match self {
            ResponseEnvelope::Records(r) => ResponseEnvelope::Records(format(r)),
            ResponseEnvelope::NewResource(r) => ResponseEnvelope::NewResource(format(r)),
            ResponseEnvelope::UpdatedResource(r) => ResponseEnvelope::UpdatedResource(format(r)),
            ResponseEnvelope::ResourceDeleted(r) => ResponseEnvelope::ResourceDeleted(format(r)),
            other => other,
        }
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Rewrite temporal values and reorder keys by projection
///
/// Keys not named in `projection` keep their relative order and come first;
/// projected keys follow in request order.
pub fn format_records(records: Vec<Record>, projection: &[String]) -> Vec<Record> {
    records
        .into_iter()
        .map(|record| format_record(record, projection))
        .collect()
}

fn format_record(mut record: Record, projection: &[String]) -> Record {
    let mut projected = Vec::with_capacity(projection.len());
    for field in projection {
        if let Some(value) = record.shift_remove(field) {
            projected.push((field.clone(), value));
        }
    }

    record
        .into_iter()
        .chain(projected)
        .map(|(key, value)| (key, value.normalized()))
        .collect()
}
