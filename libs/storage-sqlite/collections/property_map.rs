use rusqlite::types::Value;
use rusqlite::Row;
use sql_collection_db::{Connection, QueryMap, StoreError, StoreResult, TableSchema};

/// `property(key, value)`: free-form store metadata keyed by name.
pub struct PropertySchema;

impl TableSchema for PropertySchema {
    type Key = String;
    type Value = Option<String>;

    fn table(&self) -> &str {
        "property"
    }

    fn key_column(&self) -> &str {
        "key"
    }

    fn value_columns(&self) -> &[&str] {
        &["value"]
    }

    fn key_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<String> {
        row.get(index).map_err(StoreError::from)
    }

    fn value_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<Option<String>> {
        row.get(index).map_err(StoreError::from)
    }

    fn key_to_sql(&self, key: &String) -> Value {
        Value::Text(key.clone())
    }

    fn value_to_sql(&self, value: &Option<String>) -> Vec<Value> {
        vec![match value {
            Some(text) => Value::Text(text.clone()),
            None => Value::Null,
        }]
    }
}

pub fn property_map(connection: &Connection) -> QueryMap<'_, PropertySchema> {
    connection.collection(PropertySchema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use sql_collection_db::{KeyRange, ValueFilter};

    fn build_connection() -> Connection {
        let connection = Connection::in_memory().unwrap();
        schema::bootstrap(&connection).unwrap();
        connection
    }

    #[test]
    pub fn test_put_returns_previous_value() {
        let connection = build_connection();
        let map = property_map(&connection);

        let key = "schema_version".to_string();
        assert_eq!(map.put(&key, &Some("1".to_string())).unwrap(), None);
        assert_eq!(
            map.put(&key, &Some("2".to_string())).unwrap(),
            Some(Some("1".to_string()))
        );
        assert_eq!(map.get(&key).unwrap(), Some(Some("2".to_string())));
    }

    #[test]
    pub fn test_null_values_are_filterable() {
        let connection = build_connection();
        let map = property_map(&connection);

        map.put(&"a".to_string(), &None).unwrap();
        map.put(&"b".to_string(), &Some("x".to_string())).unwrap();

        assert_eq!(
            map.len_range(&KeyRange::all(), &ValueFilter::Null).unwrap(),
            1
        );
        assert_eq!(
            map.remove_range(&KeyRange::all(), &ValueFilter::Null)
                .unwrap(),
            1
        );
        assert_eq!(map.get(&"b".to_string()).unwrap(), Some(Some("x".to_string())));
    }

    #[test]
    pub fn test_string_keys_order_lexicographically() {
        let connection = build_connection();
        let map = property_map(&connection);

        for key in ["beta", "alpha", "gamma"] {
            map.put(&key.to_string(), &None).unwrap();
        }
        assert_eq!(map.first_entry().unwrap().unwrap().0, "alpha");
        assert_eq!(map.last_entry().unwrap().unwrap().0, "gamma");
        assert_eq!(
            map.higher_entry(&"alpha".to_string()).unwrap().unwrap().0,
            "beta"
        );
    }
}
