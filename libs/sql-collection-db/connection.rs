use crate::connection_config::ConnectionConfig;
use crate::query_map::QueryMap;
use crate::table_schema::TableSchema;
use crate::{StoreError, StoreResult};

/// Single-writer wrapper around one SQLite connection.
///
/// The framework holds no locks: the design assumes one thread drives the
/// connection at a time, and every call is a synchronous round trip to the
/// store (see the batching notes on [`Connection::run_batch`]).
pub struct Connection {
    conn: rusqlite::Connection,
}

impl Connection {
    pub fn initialize(config: ConnectionConfig) -> StoreResult<Connection> {
        let conn = match &config.database_path {
            Some(path) => rusqlite::Connection::open(path)?,
            None => rusqlite::Connection::open_in_memory()?,
        };

        if config.enforce_foreign_keys {
            conn.pragma_update(None, "foreign_keys", true)?;
        }

        Ok(Self { conn })
    }

    pub fn in_memory() -> StoreResult<Connection> {
        Connection::initialize(ConnectionConfig::builder().build())
    }

    /// Builds the generic ordered collection over the given schema. The map
    /// is stateless apart from the connection reference and the schema
    /// metadata; nothing is cached across calls.
    pub fn collection<S: TableSchema>(&self, schema: S) -> QueryMap<'_, S> {
        QueryMap::new(self, schema)
    }

    pub fn is_autocommit(&self) -> bool {
        self.conn.is_autocommit()
    }

    pub fn execute_ddl(&self, sql: &str) -> StoreResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }

    /// Brackets a multi-element operation in an explicit transaction: when
    /// the connection is in autocommit an explicit transaction is opened and
    /// committed around the element-wise primitives; nested calls are no-ops.
    ///
    /// On failure the partial work is committed as well so the connection
    /// always returns to its prior autocommit state — there is no automatic
    /// rollback. Callers requiring all-or-nothing semantics bracket the batch
    /// in their own transaction and roll back on the propagated error.
    pub fn run_batch<T>(&self, operation: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let was_autocommit = self.conn.is_autocommit();
        if was_autocommit {
            self.conn.execute_batch("BEGIN")?;
        }

        let outcome = operation();

        if was_autocommit {
            if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
                // The transaction could not be finalized; clear it so the
                // connection is usable again, then propagate the original
                // failure when there was one.
                let _ = self.conn.execute_batch("ROLLBACK");
                return match outcome {
                    Err(err) => Err(err),
                    Ok(_) => Err(StoreError::from(commit_err)),
                };
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use tempfile::tempdir;

    fn counter_connection() -> Connection {
        let connection = Connection::in_memory().unwrap();
        connection
            .execute_ddl("CREATE TABLE counter (id INTEGER PRIMARY KEY, n INTEGER NOT NULL)")
            .unwrap();
        connection
    }

    fn count(connection: &Connection) -> i64 {
        connection
            .raw()
            .query_row("SELECT COUNT(id) FROM counter", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    pub fn test_initialize_file_backed() {
        let temp = tempdir().unwrap();
        let config = ConnectionConfig::builder()
            .database_path(temp.path().join("store.db"))
            .build();
        let connection = Connection::initialize(config).unwrap();
        assert!(connection.is_autocommit());
    }

    #[test]
    pub fn test_run_batch_commits_and_restores_autocommit() {
        let connection = counter_connection();

        let inserted: i64 = connection
            .run_batch(|| {
                for n in 0..5 {
                    connection
                        .raw()
                        .execute("INSERT INTO counter (n) VALUES (?1)", [n])
                        .map_err(StoreError::from)?;
                }
                assert!(!connection.is_autocommit());
                Ok(5)
            })
            .unwrap();

        assert_eq!(inserted, 5);
        assert!(connection.is_autocommit());
        assert_eq!(count(&connection), 5);
    }

    #[test]
    pub fn test_run_batch_failure_keeps_partial_work_and_restores_autocommit() {
        let connection = counter_connection();

        let outcome: StoreResult<()> = connection.run_batch(|| {
            connection
                .raw()
                .execute("INSERT INTO counter (n) VALUES (1)", [])
                .map_err(StoreError::from)?;
            Err(StoreError::data_access("mid-batch failure"))
        });

        assert!(outcome.is_err());
        assert!(connection.is_autocommit());
        // Partial writes survive: atomicity is the caller's responsibility.
        assert_eq!(count(&connection), 1);
    }

    #[test]
    pub fn test_run_batch_nests_without_double_begin() {
        let connection = counter_connection();

        connection
            .run_batch(|| {
                connection.run_batch(|| {
                    connection
                        .raw()
                        .execute("INSERT INTO counter (n) VALUES (1)", [])
                        .map_err(StoreError::from)?;
                    Ok(())
                })?;
                // Still inside the outer transaction.
                assert!(!connection.is_autocommit());
                Ok(())
            })
            .unwrap();

        assert!(connection.is_autocommit());
        assert_eq!(count(&connection), 1);
    }
}
