use sql_collection_db::{Connection, StoreError, StoreResult};

/// Integrity constraints the collections rely on: prefix texts are unique,
/// every link points at an existing prefix, and the full string only exists
/// as the `full_link` view expression.
const BOOTSTRAP_SQL: &str = "
CREATE TABLE IF NOT EXISTS prefix (
    id INTEGER PRIMARY KEY,
    text TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS link (
    id INTEGER PRIMARY KEY,
    prefix_id INTEGER NOT NULL REFERENCES prefix (id),
    suffix TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS link_prefix_id ON link (prefix_id);
CREATE TABLE IF NOT EXISTS property (
    key TEXT NOT NULL PRIMARY KEY,
    value TEXT
);
CREATE VIEW IF NOT EXISTS full_link AS
    SELECT link.id AS id, prefix.text || link.suffix AS url
    FROM link JOIN prefix ON prefix.id = link.prefix_id;
";

pub(crate) fn bootstrap(connection: &Connection) -> StoreResult<()> {
    connection.execute_ddl(BOOTSTRAP_SQL)?;

    // The empty prefix is the universal fallback and must always exist.
    connection
        .raw()
        .execute(
            "INSERT INTO prefix (text)
             SELECT '' WHERE NOT EXISTS (SELECT 1 FROM prefix WHERE text = '')",
            [],
        )
        .map_err(StoreError::from)?;

    Ok(())
}

pub(crate) fn create_list_table(connection: &Connection, table: &str) -> StoreResult<()> {
    connection.execute_ddl(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY,
            link_id INTEGER NOT NULL REFERENCES link (id)
        )"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_bootstrap_is_idempotent_and_seeds_empty_prefix() {
        let connection = Connection::in_memory().unwrap();
        bootstrap(&connection).unwrap();
        bootstrap(&connection).unwrap();

        let count: i64 = connection
            .raw()
            .query_row("SELECT COUNT(id) FROM prefix WHERE text = ''", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    pub fn test_link_requires_existing_prefix() {
        let connection = Connection::in_memory().unwrap();
        bootstrap(&connection).unwrap();

        let err = connection
            .raw()
            .execute(
                "INSERT INTO link (prefix_id, suffix) VALUES (999, 'x')",
                [],
            )
            .unwrap_err();
        let err: StoreError = err.into();
        assert!(err.is_constraint_violation());
    }
}
