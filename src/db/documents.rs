use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Weak;
use tracing::{debug, warn};
use uuid::Uuid;

use super::Database;
use crate::error::StoreError;

/// Result delivered to a subscriber after each change.
pub type Snapshot = Result<Vec<Document>, StoreError>;

type Callback = Box<dyn FnMut(Snapshot)>;

/// A stored document: its store-assigned id and top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self, collection: &str) -> Result<T, StoreError> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|source| {
            StoreError::Malformed {
                collection: collection.to_string(),
                id: self.id.clone(),
                source,
            }
        })
    }
}

/// Serialize a value into a document body.
pub(crate) fn to_fields<T: Serialize>(value: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// A collection query: optional equality filter on one field, optional ordering.
///
/// Without an ordering, documents come back in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    filter: Option<(String, Value)>,
    order: Option<(String, Direction)>,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Self {
            collection: name.to_string(),
            filter: None,
            order: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filter = Some((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order = Some((field.to_string(), direction));
        self
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?");
        let mut params = vec![SqlValue::Text(self.collection.clone())];

        if let Some((field, value)) = &self.filter {
            sql.push_str(" AND json_extract(body, ?) = ?");
            params.push(SqlValue::Text(json_path(field)));
            params.push(json_to_sql(value));
        }

        sql.push_str(" ORDER BY ");
        if let Some((field, direction)) = &self.order {
            sql.push_str(&format!("json_extract(body, ?) {}, ", direction.as_sql()));
            params.push(SqlValue::Text(json_path(field)));
        }
        sql.push_str("rowid ASC");

        (sql, params)
    }
}

fn json_path(field: &str) -> String {
    format!("$.{}", field)
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

enum WriteOp {
    Add {
        collection: String,
        id: String,
        fields: Map<String, Value>,
    },
    Update {
        collection: String,
        id: String,
        fields: Map<String, Value>,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl WriteOp {
    fn collection(&self) -> &str {
        match self {
            Self::Add { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }
}

/// Writes applied together in one transaction: all succeed or none do.
#[derive(Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a new document. Returns the id it will be stored under.
    pub fn add<T: Serialize>(&mut self, collection: &str, value: &T) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.ops.push(WriteOp::Add {
            collection: collection.to_string(),
            id: id.clone(),
            fields: to_fields(value)?,
        });
        Ok(id)
    }

    /// Queue a merge of top-level fields into an existing document.
    pub fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>) {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    pub fn delete(&mut self, collection: &str, id: &str) {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

// ==================== ROW HELPERS ====================

fn insert_row(
    conn: &Connection,
    collection: &str,
    id: &str,
    fields: &Map<String, Value>,
) -> Result<(), StoreError> {
    let now = Utc::now().to_rfc3339();
    let body = serde_json::to_string(fields)?;
    conn.execute(
        "INSERT INTO documents (collection, id, body, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        params![collection, id, body, now, now],
    )?;
    Ok(())
}

fn read_row(conn: &Connection, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ? AND id = ?",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    body.map(|body| parse_body(collection, id, &body)).transpose()
}

fn merge_row(
    conn: &Connection,
    collection: &str,
    id: &str,
    patch: Map<String, Value>,
) -> Result<(), StoreError> {
    let Some(mut doc) = read_row(conn, collection, id)? else {
        return Err(StoreError::not_found(collection, id));
    };
    for (key, value) in patch {
        doc.fields.insert(key, value);
    }

    let body = serde_json::to_string(&doc.fields)?;
    conn.execute(
        "UPDATE documents SET body = ?, updated_at = ? WHERE collection = ? AND id = ?",
        params![body, Utc::now().to_rfc3339(), collection, id],
    )?;
    Ok(())
}

fn delete_row(conn: &Connection, collection: &str, id: &str) -> Result<bool, StoreError> {
    let rows = conn.execute(
        "DELETE FROM documents WHERE collection = ? AND id = ?",
        params![collection, id],
    )?;
    Ok(rows > 0)
}

fn parse_body(collection: &str, id: &str, body: &str) -> Result<Document, StoreError> {
    match serde_json::from_str(body) {
        Ok(Value::Object(fields)) => Ok(Document {
            id: id.to_string(),
            fields,
        }),
        Ok(_) => Err(StoreError::NotAnObject),
        Err(source) => Err(StoreError::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            source,
        }),
    }
}

impl Database {
    // ==================== DOCUMENT CRUD ====================

    /// Store a new document and return its assigned id.
    pub fn add_document<T: Serialize>(&self, collection: &str, value: &T) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        insert_row(&self.conn, collection, &id, &to_fields(value)?)?;
        debug!(collection, id = %id, "added document");
        self.notify(collection);
        Ok(id)
    }

    pub fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        read_row(&self.conn, collection, id)
    }

    /// Merge top-level fields into an existing document.
    pub fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        merge_row(&self.conn, collection, id, fields)?;
        debug!(collection, id, "updated document");
        self.notify(collection);
        Ok(())
    }

    pub fn delete_document(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let deleted = delete_row(&self.conn, collection, id)?;
        if deleted {
            debug!(collection, id, "deleted document");
            self.notify(collection);
        }
        Ok(deleted)
    }

    pub fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let (sql, params) = query.to_sql();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.iter()
            .map(|(id, body)| parse_body(&query.collection, id, body))
            .collect()
    }

    /// Apply every write in the batch inside one transaction.
    pub fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let touched: BTreeSet<String> = batch
            .ops
            .iter()
            .map(|op| op.collection().to_string())
            .collect();

        // Dropping the transaction without commit rolls back.
        let tx = self.conn.unchecked_transaction()?;
        for op in batch.ops {
            match op {
                WriteOp::Add {
                    collection,
                    id,
                    fields,
                } => insert_row(&tx, &collection, &id, &fields)?,
                WriteOp::Update {
                    collection,
                    id,
                    fields,
                } => merge_row(&tx, &collection, &id, fields)?,
                WriteOp::Delete { collection, id } => {
                    delete_row(&tx, &collection, &id)?;
                }
            }
        }
        tx.commit()?;

        for collection in &touched {
            self.notify(collection);
        }
        Ok(())
    }

    // ==================== SUBSCRIPTIONS ====================

    /// Watch a query. The callback receives the current result immediately and
    /// again after every write to the query's collection, until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, query: Query, mut callback: F) -> Result<Subscription, StoreError>
    where
        F: FnMut(Snapshot) + 'static,
    {
        let initial = self.query(&query)?;
        callback(Ok(initial));

        let collection = query.collection.clone();
        let id = self.listeners.borrow_mut().insert(query, Box::new(callback));
        debug!(subscription = id, collection = %collection, "subscribed");
        Ok(Subscription {
            id,
            registry: std::rc::Rc::downgrade(&self.listeners),
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn notify(&self, collection: &str) {
        let targets = self.listeners.borrow().matching(collection);
        for (id, query) in targets {
            // Taken out while running so the callback may write (and so re-enter
            // notify) without a double borrow. A listener never sees its own
            // nested notification.
            let taken = self.listeners.borrow_mut().take(id);
            let Some(mut callback) = taken else {
                continue;
            };

            let snapshot = self.query(&query);
            if let Err(ref e) = snapshot {
                warn!(subscription = id, collection, error = %e, "snapshot query failed");
            }
            callback(snapshot);

            self.listeners.borrow_mut().restore(id, callback);
        }
    }
}

struct Listener {
    query: Query,
    callback: Option<Callback>,
}

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

impl Listeners {
    fn insert(&mut self, query: Query, callback: Callback) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(
            id,
            Listener {
                query,
                callback: Some(callback),
            },
        );
        id
    }

    fn remove(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    fn matching(&self, collection: &str) -> Vec<(u64, Query)> {
        self.entries
            .iter()
            .filter(|(_, l)| l.query.collection == collection)
            .map(|(id, l)| (*id, l.query.clone()))
            .collect()
    }

    fn take(&mut self, id: u64) -> Option<Callback> {
        self.entries.get_mut(&id).and_then(|l| l.callback.take())
    }

    /// Put a callback back unless its subscription was dropped meanwhile.
    fn restore(&mut self, id: u64, callback: Callback) {
        if let Some(listener) = self.entries.get_mut(&id) {
            listener.callback = Some(callback);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Live-query handle. Dropping it stops delivery.
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Listeners>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|r| r.borrow().entries.contains_key(&self.id))
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.borrow_mut().remove(self.id) {
                debug!(subscription = self.id, "unsubscribed");
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
