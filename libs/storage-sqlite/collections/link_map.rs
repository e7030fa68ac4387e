use linkstash_storage_core::{LinkId, LinkParts};
use rusqlite::types::Value;
use rusqlite::Row;
use sql_collection_db::{Connection, QueryMap, StoreError, StoreResult, TableSchema};

/// `link(id, prefix_id, suffix)`: the stored decomposition. The value spans
/// two columns; the logical full string lives only in the `full_link` view.
pub struct LinkPartsSchema;

impl TableSchema for LinkPartsSchema {
    type Key = LinkId;
    type Value = LinkParts;

    fn table(&self) -> &str {
        "link"
    }

    fn key_column(&self) -> &str {
        "id"
    }

    fn value_columns(&self) -> &[&str] {
        &["prefix_id", "suffix"]
    }

    fn key_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<LinkId> {
        row.get(index).map_err(StoreError::from)
    }

    fn value_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<LinkParts> {
        Ok(LinkParts {
            prefix_id: row.get(index).map_err(StoreError::from)?,
            suffix: row.get(index + 1).map_err(StoreError::from)?,
        })
    }

    fn key_to_sql(&self, key: &LinkId) -> Value {
        Value::Integer(*key)
    }

    fn value_to_sql(&self, value: &LinkParts) -> Vec<Value> {
        vec![
            Value::Integer(value.prefix_id),
            Value::Text(value.suffix.clone()),
        ]
    }

    fn generated_keys(&self) -> bool {
        true
    }

    fn key_from_rowid(&self, rowid: i64) -> Option<LinkId> {
        Some(rowid)
    }
}

/// Read-only map over the `full_link` view: id → reconstructed full string.
/// Writes go through [`LinkPartsSchema`] after prefix resolution.
pub struct FullLinkSchema;

impl TableSchema for FullLinkSchema {
    type Key = LinkId;
    type Value = String;

    fn table(&self) -> &str {
        "full_link"
    }

    fn key_column(&self) -> &str {
        "id"
    }

    fn value_columns(&self) -> &[&str] {
        &["url"]
    }

    fn key_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<LinkId> {
        row.get(index).map_err(StoreError::from)
    }

    fn value_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<String> {
        row.get(index).map_err(StoreError::from)
    }

    fn key_to_sql(&self, key: &LinkId) -> Value {
        Value::Integer(*key)
    }

    fn value_to_sql(&self, value: &String) -> Vec<Value> {
        vec![Value::Text(value.clone())]
    }

    fn writable(&self) -> bool {
        false
    }
}

pub fn link_parts_map(connection: &Connection) -> QueryMap<'_, LinkPartsSchema> {
    connection.collection(LinkPartsSchema)
}

pub fn full_link_map(connection: &Connection) -> QueryMap<'_, FullLinkSchema> {
    connection.collection(FullLinkSchema)
}
