use crate::StoreResult;
use rusqlite::types::Value;
use rusqlite::Row;
use std::fmt::Debug;

/// Static table/column metadata plus row marshalling for one collection.
///
/// One generic engine ([`crate::QueryMap`]) drives every concrete collection;
/// a schema only describes where the key and value live and how they convert
/// to and from SQL. Values may span several columns on the write side (the
/// link table stores `(prefix_id, suffix)`), and may be read back from a view
/// rather than the mutation table (the reconstructed full-link string).
pub trait TableSchema {
    type Key: Clone + PartialEq + PartialOrd + Debug;
    type Value: Clone + PartialEq + Debug;

    /// Mutation target table.
    fn table(&self) -> &str;

    /// Source that read queries run against; defaults to the mutation table,
    /// view-backed schemas override it with their joined view.
    fn read_source(&self) -> &str {
        self.table()
    }

    fn key_column(&self) -> &str;

    /// Columns the value occupies in the mutation table, in marshalling order.
    fn value_columns(&self) -> &[&str];

    /// Expressions used to read the value back from `read_source`; defaults
    /// to the write columns.
    fn value_select(&self) -> Vec<String> {
        self.value_columns().iter().map(|c| (*c).to_owned()).collect()
    }

    /// Marshals the key from the row column at `index`.
    fn key_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<Self::Key>;

    /// Marshals the value from the row columns starting at `index`.
    fn value_from_row(&self, row: &Row<'_>, index: usize) -> StoreResult<Self::Value>;

    fn key_to_sql(&self, key: &Self::Key) -> Value;

    /// One SQL value per entry of `value_columns`.
    fn value_to_sql(&self, value: &Self::Value) -> Vec<Value>;

    /// Whether `add` may rely on the store's auto-generated key facility.
    fn generated_keys(&self) -> bool {
        false
    }

    /// Maps the rowid reported by the store back to a key; only meaningful
    /// when `generated_keys` returns true.
    fn key_from_rowid(&self, _rowid: i64) -> Option<Self::Key> {
        None
    }

    /// View-backed schemas reject mutation.
    fn writable(&self) -> bool {
        true
    }
}
