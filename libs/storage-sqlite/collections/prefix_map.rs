use linkstash_storage_core::PrefixId;
use rusqlite::types::Value;
use rusqlite::Row;
use sql_collection_db::{Connection, QueryMap, StoreError, StoreResult, TableSchema};

/// `prefix(id, text)`: surrogate id → unique prefix text.
pub struct PrefixSchema;

impl TableSchema for PrefixSchema {
    type Key = PrefixId;
    type Value = String;

    fn table(&self) -> &str {
        "prefix"
    }

    fn key_column(&self) -> &str {
        "id"
    }

    fn value_columns(&self) -> &[&str] {
        &["text"]
    }

    fn key_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<PrefixId> {
        row.get(index).map_err(StoreError::from)
    }

    fn value_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<String> {
        row.get(index).map_err(StoreError::from)
    }

    fn key_to_sql(&self, key: &PrefixId) -> Value {
        Value::Integer(*key)
    }

    fn value_to_sql(&self, value: &String) -> Vec<Value> {
        vec![Value::Text(value.clone())]
    }

    fn generated_keys(&self) -> bool {
        true
    }

    fn key_from_rowid(&self, rowid: i64) -> Option<PrefixId> {
        Some(rowid)
    }
}

pub fn prefix_map(connection: &Connection) -> QueryMap<'_, PrefixSchema> {
    connection.collection(PrefixSchema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn build_connection() -> Connection {
        let connection = Connection::in_memory().unwrap();
        schema::bootstrap(&connection).unwrap();
        connection
    }

    #[test]
    pub fn test_empty_prefix_is_present_after_bootstrap() {
        let connection = build_connection();
        let map = prefix_map(&connection);
        assert!(map.contains_value(&String::new()).unwrap());
    }

    #[test]
    pub fn test_duplicate_text_is_a_constraint_violation() {
        let connection = build_connection();
        let map = prefix_map(&connection);

        map.add(&"http://".to_string()).unwrap();
        let err = map.add(&"http://".to_string()).unwrap_err();
        assert!(err.is_constraint_violation());

        // add_if_absent reuses the existing row instead of failing.
        let existing = map.key_for_value(&"http://".to_string()).unwrap().unwrap();
        assert_eq!(map.add_if_absent(&"http://".to_string()).unwrap(), existing);
    }
}
