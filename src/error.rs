use rusqlite::{ErrorCode, ffi};
use thiserror::Error;

/// All possible errors raised by the record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{table}.{column} must be unique; the value is already taken")]
    Unique { table: String, column: String },

    #[error("{entity} #{id} does not exist")]
    MissingParent { entity: &'static str, id: i64 },

    #[error("{entity} #{id} still has dependent records; delete them first")]
    HasDependents { entity: &'static str, id: i64 },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Foreign key constraint failed")]
    ForeignKey,

    #[error("Record store not initialized. Run `studydesk init` first.")]
    NotInitialized,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Db(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    /// Lifts SQLite constraint failures into typed variants.
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, Some(msg)) = &err {
            if code.code == ErrorCode::ConstraintViolation {
                match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE => {
                        let (table, column) = constraint_target(msg);
                        return StoreError::Unique { table, column };
                    }
                    ffi::SQLITE_CONSTRAINT_NOTNULL => {
                        let (table, column) = constraint_target(msg);
                        return StoreError::MissingField(format!("{table}.{column}"));
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return StoreError::ForeignKey,
                    _ => {}
                }
            }
        }
        StoreError::Db(err)
    }
}

impl From<figment::Error> for StoreError {
    fn from(err: figment::Error) -> Self {
        StoreError::Config(err.to_string())
    }
}

/// Pulls `table.column` out of a message like
/// `UNIQUE constraint failed: user.username`.
fn constraint_target(msg: &str) -> (String, String) {
    let target = msg
        .rsplit_once(": ")
        .map(|(_, t)| t)
        .unwrap_or(msg)
        .split(',')
        .next()
        .unwrap_or_default()
        .trim();
    match target.split_once('.') {
        Some((table, column)) => (table.to_string(), column.to_string()),
        None => (String::new(), target.to_string()),
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_target() {
        assert_eq!(
            constraint_target("UNIQUE constraint failed: user.email"),
            ("user".to_string(), "email".to_string())
        );
        assert_eq!(
            constraint_target("NOT NULL constraint failed: task.name"),
            ("task".to_string(), "name".to_string())
        );
    }

    #[test]
    fn test_unique_violation_maps_to_variant() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('x');")
            .unwrap();
        let err: StoreError = conn
            .execute("INSERT INTO t VALUES ('x')", [])
            .unwrap_err()
            .into();
        match err {
            StoreError::Unique { table, column } => {
                assert_eq!(table, "t");
                assert_eq!(column, "name");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_not_null_violation_maps_to_variant() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT NOT NULL);")
            .unwrap();
        let err: StoreError = conn
            .execute("INSERT INTO t VALUES (NULL)", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::MissingField(ref f) if f == "t.name"));
    }
}
