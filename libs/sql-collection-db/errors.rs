use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Uniqueness or foreign-key failure on insert/update; callers may react
    /// (e.g. re-resolve a key) instead of treating the store as unavailable.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// Connectivity or driver-level failure, fatal to the current operation.
    #[error("data access failure: {0}")]
    DataAccess(String),
    /// Invalid argument detected before any statement was issued.
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl StoreError {
    pub fn constraint_violation(err: impl ToString) -> Self {
        StoreError::ConstraintViolation(err.to_string())
    }

    pub fn data_access(err: impl ToString) -> Self {
        StoreError::DataAccess(err.to_string())
    }

    pub fn contract_violation(err: impl ToString) -> Self {
        StoreError::ContractViolation(err.to_string())
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreError::ConstraintViolation(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::ConstraintViolation(err.to_string())
            }
            _ => StoreError::DataAccess(err.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_constraint_code_maps_to_constraint_violation() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, label TEXT NOT NULL UNIQUE)")
            .unwrap();
        conn.execute("INSERT INTO t (label) VALUES ('a')", []).unwrap();

        let err: StoreError = conn
            .execute("INSERT INTO t (label) VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(err.is_constraint_violation());
    }

    #[test]
    pub fn test_driver_failure_maps_to_data_access() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: StoreError = conn.execute("SELECT * FROM missing", []).unwrap_err().into();
        assert!(matches!(err, StoreError::DataAccess(_)));
    }
}
