use linkstash_storage_core::LinkId;
use rusqlite::types::Value;
use rusqlite::Row;
use sql_collection_db::{Connection, QueryMap, StoreError, StoreResult, TableSchema};

/// A named auxiliary table of link references, ordered by insertion rowid.
/// Used for user-defined collections (reading lists, pinned sets, ...).
pub struct ListMemberSchema {
    table: String,
}

impl ListMemberSchema {
    /// Table names reach SQL as identifiers, so only plain identifier
    /// characters are accepted.
    pub fn new(table: impl Into<String>) -> StoreResult<Self> {
        let table = table.into();
        let mut chars = table.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };
        if !valid {
            return Err(StoreError::contract_violation(format!(
                "invalid list table name: {table:?}"
            )));
        }
        Ok(Self { table })
    }
}

impl TableSchema for ListMemberSchema {
    type Key = i64;
    type Value = LinkId;

    fn table(&self) -> &str {
        &self.table
    }

    fn key_column(&self) -> &str {
        "id"
    }

    fn value_columns(&self) -> &[&str] {
        &["link_id"]
    }

    fn key_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<i64> {
        row.get(index).map_err(StoreError::from)
    }

    fn value_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<LinkId> {
        row.get(index).map_err(StoreError::from)
    }

    fn key_to_sql(&self, key: &i64) -> Value {
        Value::Integer(*key)
    }

    fn value_to_sql(&self, value: &LinkId) -> Vec<Value> {
        vec![Value::Integer(*value)]
    }

    fn generated_keys(&self) -> bool {
        true
    }

    fn key_from_rowid(&self, rowid: i64) -> Option<i64> {
        Some(rowid)
    }
}

pub fn list_map<'conn>(
    connection: &'conn Connection,
    table: &str,
) -> StoreResult<QueryMap<'conn, ListMemberSchema>> {
    Ok(connection.collection(ListMemberSchema::new(table)?))
}
