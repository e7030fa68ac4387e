use crate::connection::Connection;
use crate::key_range::{KeyRange, Order, ValueFilter};
use crate::snapshot::Snapshot;
use crate::table_schema::TableSchema;
use crate::{StoreError, StoreResult};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracing::{instrument, trace, warn};

/// Ordered key→value map over one table or view.
///
/// Every operation is a parameterized statement assembled from the schema's
/// table/column metadata; the map owns no rows and caches nothing across
/// calls. Range views, boundary navigation and iteration all reduce to the
/// same bounded-scan template.
pub struct QueryMap<'conn, S: TableSchema> {
    connection: &'conn Connection,
    schema: S,
}

impl<'conn, S: TableSchema> QueryMap<'conn, S> {
    pub(crate) fn new(connection: &'conn Connection, schema: S) -> Self {
        Self { connection, schema }
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn connection(&self) -> &'conn Connection {
        self.connection
    }

    // ---- point operations ------------------------------------------------

    #[instrument(skip(self))]
    pub fn get(&self, key: &S::Key) -> StoreResult<Option<S::Value>> {
        trace!("point lookup");
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            self.value_select_list(),
            self.schema.read_source(),
            self.schema.key_column(),
        );
        let mut statement = self.connection.raw().prepare(&sql)?;
        let mut rows = statement.query([self.schema.key_to_sql(key)])?;
        match rows.next()? {
            // A row whose value cannot be marshalled back is treated as
            // absent on read probes; write paths still surface the error.
            Some(row) => Ok(self.schema.value_from_row(row, 0).ok()),
            None => Ok(None),
        }
    }

    pub fn contains_key(&self, key: &S::Key) -> StoreResult<bool> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = ? LIMIT 1",
            self.schema.read_source(),
            self.schema.key_column(),
        );
        let mut statement = self.connection.raw().prepare(&sql)?;
        Ok(statement.exists([self.schema.key_to_sql(key)])?)
    }

    pub fn contains_value(&self, value: &S::Value) -> StoreResult<bool> {
        let (where_sql, params) =
            self.read_predicate(&KeyRange::all(), &ValueFilter::Eq(value));
        let sql = format!(
            "SELECT 1 FROM {}{} LIMIT 1",
            self.schema.read_source(),
            where_sql
        );
        let mut statement = self.connection.raw().prepare(&sql)?;
        Ok(statement.exists(params_from_iter(params))?)
    }

    /// All keys currently mapped to the value, lowest first.
    pub fn keys_for_value(&self, value: &S::Value) -> StoreResult<Vec<S::Key>> {
        let (where_sql, params) =
            self.read_predicate(&KeyRange::all(), &ValueFilter::Eq(value));
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} ASC",
            self.schema.key_column(),
            self.schema.read_source(),
            where_sql,
            self.schema.key_column(),
        );
        let mut statement = self.connection.raw().prepare(&sql)?;
        let mut rows = statement.query(params_from_iter(params))?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(self.schema.key_from_row(row, 0)?);
        }
        Ok(keys)
    }

    pub fn key_for_value(&self, value: &S::Value) -> StoreResult<Option<S::Key>> {
        Ok(self.keys_for_value(value)?.into_iter().next())
    }

    #[instrument(skip(self))]
    pub fn put(&self, key: &S::Key, value: &S::Value) -> StoreResult<Option<S::Value>> {
        trace!("put entry");
        self.ensure_writable()?;
        let previous = self.get(key)?;
        if self.contains_key(key)? {
            let assignments = self
                .schema
                .value_columns()
                .iter()
                .map(|column| format!("{column} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE {} SET {} WHERE {} = ?",
                self.schema.table(),
                assignments,
                self.schema.key_column(),
            );
            let mut params = self.schema.value_to_sql(value);
            params.push(self.schema.key_to_sql(key));
            self.connection.raw().execute(&sql, params_from_iter(params))?;
        } else {
            let columns = self.schema.value_columns();
            let placeholders = vec!["?"; columns.len() + 1].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}, {}) VALUES ({})",
                self.schema.table(),
                self.schema.key_column(),
                columns.join(", "),
                placeholders,
            );
            let mut params = vec![self.schema.key_to_sql(key)];
            params.extend(self.schema.value_to_sql(value));
            self.connection.raw().execute(&sql, params_from_iter(params))?;
        }
        Ok(previous)
    }

    #[instrument(skip(self))]
    pub fn remove(&self, key: &S::Key) -> StoreResult<Option<S::Value>> {
        trace!("remove entry");
        self.ensure_writable()?;
        let previous = self.get(key)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            self.schema.table(),
            self.schema.key_column(),
        );
        self.connection
            .raw()
            .execute(&sql, [self.schema.key_to_sql(key)])?;
        Ok(previous)
    }

    /// Inserts the value under a store-generated key and returns that key.
    #[instrument(skip(self))]
    pub fn add(&self, value: &S::Value) -> StoreResult<S::Key> {
        trace!("add value");
        self.ensure_writable()?;
        if self.schema.generated_keys() {
            self.insert_value(value)?;
            let rowid = self.connection.raw().last_insert_rowid();
            return self.schema.key_from_rowid(rowid).ok_or_else(|| {
                StoreError::contract_violation(
                    "schema reports generated keys but cannot map the rowid back",
                )
            });
        }

        // Snapshot-diff fallback for stores without a usable generated-key
        // report: the keys mapped to the value before and after insertion
        // differ by the new key. An empty difference (driver quirk) falls
        // back to the lowest key currently mapped to the value.
        let before = self.keys_for_value(value)?;
        self.insert_value(value)?;
        let after = self.keys_for_value(value)?;
        let fresh = after.iter().find(|key| !before.contains(key));
        match fresh {
            Some(key) => Ok(key.clone()),
            None => after.into_iter().next().ok_or_else(|| {
                StoreError::data_access("inserted value cannot be found back in the store")
            }),
        }
    }

    /// Read-then-maybe-write: returns the key already mapped to the value or
    /// adds it. Not an atomic upsert; single-writer callers only.
    #[instrument(skip(self))]
    pub fn add_if_absent(&self, value: &S::Value) -> StoreResult<S::Key> {
        match self.key_for_value(value)? {
            Some(key) => Ok(key),
            None => self.add(value),
        }
    }

    // ---- boundary navigation ----------------------------------------------

    pub fn first_entry(&self) -> StoreResult<Option<(S::Key, S::Value)>> {
        self.neighbor(&KeyRange::all(), Order::Ascending)
    }

    pub fn last_entry(&self) -> StoreResult<Option<(S::Key, S::Value)>> {
        self.neighbor(&KeyRange::all(), Order::Descending)
    }

    /// Greatest entry strictly below the key.
    pub fn lower_entry(&self, key: &S::Key) -> StoreResult<Option<(S::Key, S::Value)>> {
        self.neighbor(&KeyRange::ending_at(key.clone(), false), Order::Descending)
    }

    /// Greatest entry at or below the key.
    pub fn floor_entry(&self, key: &S::Key) -> StoreResult<Option<(S::Key, S::Value)>> {
        self.neighbor(&KeyRange::ending_at(key.clone(), true), Order::Descending)
    }

    /// Least entry at or above the key.
    pub fn ceiling_entry(&self, key: &S::Key) -> StoreResult<Option<(S::Key, S::Value)>> {
        self.neighbor(&KeyRange::starting_at(key.clone(), true), Order::Ascending)
    }

    /// Least entry strictly above the key.
    pub fn higher_entry(&self, key: &S::Key) -> StoreResult<Option<(S::Key, S::Value)>> {
        self.neighbor(&KeyRange::starting_at(key.clone(), false), Order::Ascending)
    }

    // ---- ranged operations -------------------------------------------------

    pub fn len(&self) -> StoreResult<u64> {
        self.len_range(&KeyRange::all(), &ValueFilter::Any)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn len_range(
        &self,
        range: &KeyRange<S::Key>,
        filter: &ValueFilter<'_, S::Value>,
    ) -> StoreResult<u64> {
        let (where_sql, params) = self.read_predicate(range, filter);
        let sql = format!(
            "SELECT COUNT({}) FROM {}{}",
            self.schema.key_column(),
            self.schema.read_source(),
            where_sql,
        );
        let count: i64 =
            self.connection
                .raw()
                .query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Deletes every entry in the range, optionally narrowed to one value.
    #[instrument(skip(self))]
    pub fn remove_range(
        &self,
        range: &KeyRange<S::Key>,
        filter: &ValueFilter<'_, S::Value>,
    ) -> StoreResult<u64> {
        trace!("ranged remove");
        self.ensure_writable()?;
        self.connection.run_batch(|| {
            let (where_sql, params) = self.write_predicate(range, filter);
            let sql = format!("DELETE FROM {}{}", self.schema.table(), where_sql);
            let affected = self
                .connection
                .raw()
                .execute(&sql, params_from_iter(params))?;
            Ok(affected as u64)
        })
    }

    /// Whole-table delete: the both-open range carries no predicate at all.
    pub fn clear(&self) -> StoreResult<u64> {
        self.remove_range(&KeyRange::all(), &ValueFilter::Any)
    }

    /// Materializes the entire matching range, in the requested order, before
    /// any element is handed to the caller.
    #[instrument(skip(self))]
    pub fn snapshot(
        &self,
        range: &KeyRange<S::Key>,
        order: Order,
    ) -> StoreResult<Snapshot<'_, 'conn, S>> {
        trace!("materialize range");
        let (where_sql, params) = self.read_predicate(range, &ValueFilter::Any);
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} {}",
            self.select_list(),
            self.schema.read_source(),
            where_sql,
            self.schema.key_column(),
            order.sql(),
        );
        let mut statement = self.connection.raw().prepare(&sql)?;
        let mut rows = statement.query(params_from_iter(params))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let key = self.schema.key_from_row(row, 0)?;
            let value = self.schema.value_from_row(row, 1)?;
            entries.push((key, value));
        }
        Ok(Snapshot::new(self, entries))
    }

    /// Read-only iteration: a failed query degrades to an empty snapshot with
    /// a deferred warning instead of an error.
    pub fn iter(&self, range: &KeyRange<S::Key>, order: Order) -> Snapshot<'_, 'conn, S> {
        match self.snapshot(range, order) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%err, "range query failed, iterating over an empty snapshot");
                Snapshot::new(self, Vec::new())
            }
        }
    }

    // ---- batches -----------------------------------------------------------

    pub fn put_all(&self, entries: &[(S::Key, S::Value)]) -> StoreResult<()> {
        self.connection.run_batch(|| {
            for (key, value) in entries {
                self.put(key, value)?;
            }
            Ok(())
        })
    }

    pub fn add_all(&self, values: &[S::Value]) -> StoreResult<Vec<S::Key>> {
        self.connection.run_batch(|| {
            values.iter().map(|value| self.add(value)).collect()
        })
    }

    pub fn remove_all(&self, keys: &[S::Key]) -> StoreResult<u64> {
        self.connection.run_batch(|| {
            let mut removed = 0;
            for key in keys {
                if self.remove(key)?.is_some() {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    /// Removes every entry whose key is not in `keys`.
    pub fn retain_all(&self, keys: &[S::Key]) -> StoreResult<u64> {
        self.connection.run_batch(|| {
            let mut snapshot = self.snapshot(&KeyRange::all(), Order::Ascending)?;
            let mut removed = 0;
            while let Some((key, _)) = snapshot.next() {
                if !keys.contains(&key) && self.remove(&key)?.is_some() {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    // ---- statement assembly --------------------------------------------------

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.schema.writable() {
            Ok(())
        } else {
            Err(StoreError::contract_violation(format!(
                "{} is a read-only source",
                self.schema.read_source()
            )))
        }
    }

    fn value_select_list(&self) -> String {
        self.schema.value_select().join(", ")
    }

    fn select_list(&self) -> String {
        format!("{}, {}", self.schema.key_column(), self.value_select_list())
    }

    fn insert_value(&self, value: &S::Value) -> StoreResult<()> {
        let columns = self.schema.value_columns();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.schema.table(),
            columns.join(", "),
            placeholders,
        );
        self.connection
            .raw()
            .execute(&sql, params_from_iter(self.schema.value_to_sql(value)))?;
        Ok(())
    }

    fn neighbor(
        &self,
        range: &KeyRange<S::Key>,
        order: Order,
    ) -> StoreResult<Option<(S::Key, S::Value)>> {
        let (where_sql, params) = self.read_predicate(range, &ValueFilter::Any);
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} {} LIMIT 1",
            self.select_list(),
            self.schema.read_source(),
            where_sql,
            self.schema.key_column(),
            order.sql(),
        );
        let mut statement = self.connection.raw().prepare(&sql)?;
        let mut rows = statement.query(params_from_iter(params))?;
        match rows.next()? {
            Some(row) => {
                let key = self.schema.key_from_row(row, 0)?;
                let value = self.schema.value_from_row(row, 1)?;
                Ok(Some((key, value)))
            }
            None => Ok(None),
        }
    }

    fn read_predicate(
        &self,
        range: &KeyRange<S::Key>,
        filter: &ValueFilter<'_, S::Value>,
    ) -> (String, Vec<Value>) {
        self.predicate(self.schema.value_select(), range, filter)
    }

    fn write_predicate(
        &self,
        range: &KeyRange<S::Key>,
        filter: &ValueFilter<'_, S::Value>,
    ) -> (String, Vec<Value>) {
        let columns = self
            .schema
            .value_columns()
            .iter()
            .map(|c| (*c).to_owned())
            .collect();
        self.predicate(columns, range, filter)
    }

    /// Assembles the shared predicate grammar. Parameters are bound in the
    /// fixed order: value filter (when present), from-bound key, to-bound key.
    fn predicate(
        &self,
        value_columns: Vec<String>,
        range: &KeyRange<S::Key>,
        filter: &ValueFilter<'_, S::Value>,
    ) -> (String, Vec<Value>) {
        if range.is_open() && matches!(filter, ValueFilter::Any) {
            return (String::new(), Vec::new());
        }

        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        match filter {
            ValueFilter::Any => {}
            ValueFilter::Null => {
                for column in &value_columns {
                    clauses.push(format!("{column} IS NULL"));
                }
            }
            ValueFilter::Eq(value) => {
                let bound = self.schema.value_to_sql(value);
                for (column, param) in value_columns.iter().zip(bound) {
                    clauses.push(format!("{column} = ?"));
                    params.push(param);
                }
            }
        }

        if let Some((key, inclusive)) = &range.from {
            let operator = if *inclusive { ">=" } else { ">" };
            clauses.push(format!("{} {} ?", self.schema.key_column(), operator));
            params.push(self.schema.key_to_sql(key));
        }

        if let Some((key, inclusive)) = &range.to {
            let operator = if *inclusive { "<=" } else { "<" };
            clauses.push(format!("{} {} ?", self.schema.key_column(), operator));
            params.push(self.schema.key_to_sql(key));
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params)
        }
    }
}
