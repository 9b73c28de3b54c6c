//! In-memory collaborators for testing and development
//!
//! - [`InMemoryRecordStore`]: record collections keyed by model
//! - [`InMemoryIdentityProvider`]: principals, password digests and API keys
//! - [`InMemoryPermissionSource`]: permission records, updatable at runtime

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::config::SeedConfig;
use crate::core::auth::{IdentityProvider, Principal, PrincipalId, PrincipalStore};
use crate::core::domain::{Domain, Operator, Predicate};
use crate::core::error::StoreError;
use crate::core::field::{FieldValue, MAX_RECORD_ID, Record, RecordId};
use crate::core::permission::{EntityTypeConfig, PermissionSource};
use crate::core::schema::{FieldKind, ModelDescriptor, ModelId};
use crate::core::store::{RecordStore, StoreResult};

// =============================================================================
// Record store
// =============================================================================

#[derive(Debug)]
struct Collection {
    next_id: RecordId,
    rows: BTreeMap<RecordId, Record>,
}

/// In-memory record store
///
/// Each model gets its own collection and id sequence on first write.
/// Stored rows hold declared fields only; `id` and `display_name` are
/// computed on read.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    collections: Arc<RwLock<HashMap<ModelId, Collection>>>,
    sequence_start: RecordId,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::with_sequence_start(1)
    }

    /// Start every model's id sequence at `start`
    pub fn with_sequence_start(start: RecordId) -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            sequence_start: start.max(1),
        }
    }

    fn read_lock(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<ModelId, Collection>>> {
        self.collections.read().map_err(|e| StoreError::Internal {
            message: format!("Failed to acquire read lock: {}", e),
        })
    }

    fn write_lock(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<ModelId, Collection>>> {
        self.collections.write().map_err(|e| StoreError::Internal {
            message: format!("Failed to acquire write lock: {}", e),
        })
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn search_read(
        &self,
        model: &ModelDescriptor,
        filter: &Domain,
        fields: &[String],
    ) -> StoreResult<Vec<Record>> {
        for field in fields {
            ensure_known(model, field)?;
        }
        for predicate in filter.predicates() {
            ensure_known(model, &predicate.field)?;
        }

        let collections = self.read_lock()?;
        let Some(collection) = collections.get(&model.id) else {
            return Ok(Vec::new());
        };

        let records = collection
            .rows
            .iter()
            .filter(|(id, row)| {
                filter
                    .predicates()
                    .iter()
                    .all(|p| matches(p, &read_field(model, **id, row, &p.field)))
            })
            .map(|(id, row)| {
                let mut record = Record::new();
                record.insert("id".to_string(), FieldValue::from(*id));
                for field in fields {
                    if !record.contains_key(field) {
                        record.insert(field.clone(), read_field(model, *id, row, field));
                    }
                }
                record
            })
            .collect();

        Ok(records)
    }

    async fn exists(&self, model: &ModelDescriptor, id: RecordId) -> StoreResult<bool> {
        let collections = self.read_lock()?;
        Ok(collections
            .get(&model.id)
            .is_some_and(|c| c.rows.contains_key(&id)))
    }

    async fn create(
        &self,
        model: &ModelDescriptor,
        values: &Map<String, Value>,
    ) -> StoreResult<RecordId> {
        let row = coerce_values(model, values)?;

        let mut collections = self.write_lock()?;
        let collection = collections.entry(model.id).or_insert_with(|| Collection {
            next_id: self.sequence_start,
            rows: BTreeMap::new(),
        });

        let id = collection.next_id;
        if id > MAX_RECORD_ID {
            return Err(StoreError::Internal {
                message: format!("{}: id sequence exhausted", model.name),
            });
        }
        collection.next_id = id + 1;
        collection.rows.insert(id, row);

        Ok(id)
    }

    async fn write(
        &self,
        model: &ModelDescriptor,
        id: RecordId,
        values: &Map<String, Value>,
    ) -> StoreResult<()> {
        let changes = coerce_values(model, values)?;

        let mut collections = self.write_lock()?;
        let row = collections
            .get_mut(&model.id)
            .and_then(|c| c.rows.get_mut(&id))
            .ok_or_else(|| StoreError::rejected(&model.name, format!("record {} does not exist", id)))?;

        for (field, value) in changes {
            row.insert(field, value);
        }

        Ok(())
    }

    async fn unlink(&self, model: &ModelDescriptor, id: RecordId) -> StoreResult<()> {
        let mut collections = self.write_lock()?;
        if let Some(collection) = collections.get_mut(&model.id) {
            collection.rows.remove(&id);
        }
        Ok(())
    }
}

fn ensure_known(model: &ModelDescriptor, field: &str) -> StoreResult<()> {
    if model.has_field(field) {
        Ok(())
    } else {
        Err(StoreError::rejected(
            &model.name,
            format!("unknown field '{}'", field),
        ))
    }
}

/// Value of a field as seen by readers, implicit fields included
fn read_field(model: &ModelDescriptor, id: RecordId, row: &Record, field: &str) -> FieldValue {
    match field {
        "id" => FieldValue::from(id),
        "display_name" => match row.get("name") {
            Some(FieldValue::String(name)) => FieldValue::String(name.clone()),
            _ => FieldValue::String(format!("{},{}", model.name, id)),
        },
        _ => row.get(field).cloned().unwrap_or(FieldValue::Null),
    }
}

fn coerce_values(model: &ModelDescriptor, values: &Map<String, Value>) -> StoreResult<Record> {
    values
        .iter()
        .map(|(field, value)| {
            if field == "id" || field == "display_name" {
                return Err(StoreError::rejected(
                    &model.name,
                    format!("field '{}' is read-only", field),
                ));
            }
            let declared = model.field(field).ok_or_else(|| {
                StoreError::rejected(&model.name, format!("unknown field '{}'", field))
            })?;
            let coerced = coerce(declared.kind, value).ok_or_else(|| {
                StoreError::rejected(
                    &model.name,
                    format!("invalid value for '{}' ({:?}): {}", field, declared.kind, value),
                )
            })?;
            Ok((field.clone(), coerced))
        })
        .collect()
}

/// Coerce a JSON value to a field kind; `null` and `false` clear any field
/// except booleans
fn coerce(kind: FieldKind, value: &Value) -> Option<FieldValue> {
    if value.is_null() || (kind != FieldKind::Boolean && value == &Value::Bool(false)) {
        return Some(FieldValue::Null);
    }

    match kind {
        FieldKind::Char | FieldKind::Text | FieldKind::Selection => {
            value.as_str().map(FieldValue::from)
        }
        FieldKind::Integer | FieldKind::Many2one => value.as_i64().map(FieldValue::Integer),
        FieldKind::Float => value.as_f64().map(FieldValue::Float),
        FieldKind::Boolean => value.as_bool().map(FieldValue::Boolean),
        FieldKind::Date => value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .map(FieldValue::Date),
        FieldKind::Datetime => value.as_str().and_then(parse_datetime),
        FieldKind::Json => Some(FieldValue::from(value.clone())),
    }
}

fn parse_datetime(s: &str) -> Option<FieldValue> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(FieldValue::DateTimeUtc(dt.with_timezone(&Utc)));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(FieldValue::DateTime)
}

// ── Predicate evaluation ─────────────────────────────────────────────────

fn to_json(value: &FieldValue) -> Value {
    match value.clone().normalized() {
        FieldValue::Null => Value::Null,
        FieldValue::Boolean(b) => Value::Bool(b),
        FieldValue::Integer(i) => Value::from(i),
        FieldValue::Float(f) => Value::from(f),
        FieldValue::String(s) => Value::String(s),
        FieldValue::List(items) => Value::Array(items.iter().map(to_json).collect()),
        FieldValue::Map(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), to_json(v))).collect())
        }
        // normalized() leaves no temporal variant behind
        FieldValue::Date(_) | FieldValue::DateTime(_) | FieldValue::DateTimeUtc(_) => Value::Null,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) | (Value::Null, Value::Bool(false)) => Some(Ordering::Equal),
        _ => (lhs == rhs).then_some(Ordering::Equal),
    }
}

fn equals(lhs: &Value, rhs: &Value) -> bool {
    compare(lhs, rhs) == Some(Ordering::Equal)
}

fn matches(predicate: &Predicate, value: &FieldValue) -> bool {
    let lhs = to_json(value);
    let rhs = &predicate.value;

    match predicate.operator {
        Operator::Eq => equals(&lhs, rhs),
        Operator::Ne => !equals(&lhs, rhs),
        Operator::Lt => compare(&lhs, rhs) == Some(Ordering::Less),
        Operator::Le => matches!(compare(&lhs, rhs), Some(Ordering::Less | Ordering::Equal)),
        Operator::Gt => compare(&lhs, rhs) == Some(Ordering::Greater),
        Operator::Ge => matches!(
            compare(&lhs, rhs),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::In => rhs
            .as_array()
            .is_some_and(|items| items.iter().any(|item| equals(&lhs, item))),
        Operator::NotIn => rhs
            .as_array()
            .is_some_and(|items| !items.iter().any(|item| equals(&lhs, item))),
        Operator::Like | Operator::ILike | Operator::EqLike | Operator::EqILike => {
            let (Some(text), Some(pattern)) = (lhs.as_str(), rhs.as_str()) else {
                return false;
            };
            let pattern = match predicate.operator {
                Operator::Like | Operator::ILike => format!("%{}%", pattern),
                _ => pattern.to_string(),
            };
            let insensitive = matches!(predicate.operator, Operator::ILike | Operator::EqILike);
            if insensitive {
                like(&text.to_lowercase(), &pattern.to_lowercase())
            } else {
                like(text, &pattern)
            }
        }
    }
}

/// SQL `LIKE` matching: `%` is any run, `_` is any single character
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // dp[j]: pattern[..i] matches text[..j]
    let mut dp = vec![false; text.len() + 1];
    dp[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut reachable = false;
                for j in 0..=text.len() {
                    reachable |= dp[j];
                    next[j] = reachable;
                }
            }
            _ => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1] && (*p == '_' || *p == text[j - 1]);
                }
            }
        }
        dp = next;
    }
    dp[text.len()]
}

// =============================================================================
// Identity provider / principal store
// =============================================================================

#[derive(Debug)]
struct PrincipalEntry {
    principal: Principal,
    password_digest: String,
    api_key: Option<String>,
}

#[derive(Debug, Default)]
struct IdentityState {
    databases: HashSet<String>,
    principals: HashMap<PrincipalId, PrincipalEntry>,
    next_id: PrincipalId,
}

/// In-memory identity subsystem
///
/// Passwords are kept as SHA-256 digests. Implements both
/// [`IdentityProvider`] and [`PrincipalStore`].
#[derive(Clone, Default)]
pub struct InMemoryIdentityProvider {
    state: Arc<RwLock<IdentityState>>,
}

fn password_digest(login: &str, password: &str) -> String {
    format!("{:x}", Sha256::digest(format!("{}:{}", login, password).as_bytes()))
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a provider holding the seeded databases and principals
    pub fn from_seed(seed: &SeedConfig) -> Result<Self> {
        let provider = Self::new();
        for database in &seed.databases {
            provider.add_database(database)?;
        }
        for p in &seed.principals {
            provider.add_principal(&p.database, &p.login, &p.name, &p.password)?;
        }
        Ok(provider)
    }

    pub fn add_database(&self, name: &str) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        state.databases.insert(name.to_string());
        Ok(())
    }

    pub fn add_principal(
        &self,
        database: &str,
        login: &str,
        name: &str,
        password: &str,
    ) -> Result<PrincipalId> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if !state.databases.contains(database) {
            return Err(anyhow!("Unknown database: {}", database));
        }
        if state.principals.values().any(|e| e.principal.login == login) {
            return Err(anyhow!("Login already exists: {}", login));
        }

        state.next_id += 1;
        let id = state.next_id;
        state.principals.insert(
            id,
            PrincipalEntry {
                principal: Principal {
                    id,
                    login: login.to_string(),
                    name: name.to_string(),
                    tenant: database.to_string(),
                },
                password_digest: password_digest(login, password),
                api_key: None,
            },
        );

        Ok(id)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn authenticate(&self, tenant: &str, login: &str, password: &str) -> Result<Principal> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        if !state.databases.contains(tenant) {
            return Err(anyhow!("Database not found: {}", tenant));
        }

        let entry = state
            .principals
            .values()
            .find(|e| e.principal.login == login && e.principal.tenant == tenant)
            .ok_or_else(|| anyhow!("Access Denied"))?;

        if entry.password_digest != password_digest(login, password) {
            return Err(anyhow!("Access Denied"));
        }

        Ok(entry.principal.clone())
    }
}

#[async_trait]
impl PrincipalStore for InMemoryIdentityProvider {
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Principal>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(state
            .principals
            .values()
            .find(|e| e.api_key.as_deref() == Some(api_key))
            .map(|e| e.principal.clone()))
    }

    async fn api_key_of(&self, principal: PrincipalId) -> Result<Option<String>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(state
            .principals
            .get(&principal)
            .and_then(|e| e.api_key.clone()))
    }

    async fn set_api_key(&self, principal: PrincipalId, api_key: &str) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let taken = state
            .principals
            .iter()
            .any(|(id, e)| *id != principal && e.api_key.as_deref() == Some(api_key));
        if taken {
            return Err(anyhow!("API key already assigned"));
        }

        let entry = state
            .principals
            .get_mut(&principal)
            .ok_or_else(|| anyhow!("Principal not found: {}", principal))?;
        entry.api_key = Some(api_key.to_string());

        Ok(())
    }
}

// =============================================================================
// Permission source
// =============================================================================

/// In-memory permission records
#[derive(Clone, Default)]
pub struct InMemoryPermissionSource {
    configs: Arc<RwLock<HashMap<String, EntityTypeConfig>>>,
}

impl InMemoryPermissionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of configs; later duplicates replace earlier ones
    pub fn from_configs(configs: impl IntoIterator<Item = EntityTypeConfig>) -> Self {
        let map = configs
            .into_iter()
            .map(|c| (c.model_name.clone(), c))
            .collect();
        Self {
            configs: Arc::new(RwLock::new(map)),
        }
    }

    /// Insert or replace the config of one model
    pub fn upsert(&self, config: EntityTypeConfig) -> Result<()> {
        let mut configs = self
            .configs
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        configs.insert(config.model_name.clone(), config);
        Ok(())
    }

    /// Stop exposing a model
    pub fn remove(&self, model_name: &str) -> Result<Option<EntityTypeConfig>> {
        let mut configs = self
            .configs
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        Ok(configs.remove(model_name))
    }
}

#[async_trait]
impl PermissionSource for InMemoryPermissionSource {
    async fn find(&self, model_name: &str) -> Result<Option<EntityTypeConfig>> {
        let configs = self
            .configs
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(configs.get(model_name).cloned())
    }
}
