use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
    NotNull,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConstraintKind::Unique => "unique",
            ConstraintKind::ForeignKey => "foreign key",
            ConstraintKind::Check => "check",
            ConstraintKind::NotNull => "not null",
        };
        f.write_str(label)
    }
}

/// Failure taxonomy of the store.
///
/// `Validation` is always raised before any I/O; `NotFound` and
/// `ConstraintViolation` are data conflicts; `TransactionTimeout` and
/// `TransactionConflict` are transient and safe for the caller to retry.
/// The repository itself never retries a mutation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{kind} constraint violation: {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        message: String,
    },

    #[error("invalid query: {0}")]
    Validation(String),

    #[error("transaction timed out: {0}")]
    TransactionTimeout(String),

    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Whether a caller-directed retry with backoff is reasonable.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::TransactionTimeout(_) | StoreError::TransactionConflict(_)
        )
    }

    /// Classifies a diesel error, attributing `NotFound` to `entity`.
    pub fn on(entity: &'static str, err: DieselError) -> Self {
        match err {
            DieselError::NotFound => StoreError::NotFound(entity),
            other => StoreError::from(other),
        }
    }
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => StoreError::NotFound("record"),
            DieselError::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => StoreError::ConstraintViolation {
                        kind: ConstraintKind::Unique,
                        message,
                    },
                    DatabaseErrorKind::ForeignKeyViolation => StoreError::ConstraintViolation {
                        kind: ConstraintKind::ForeignKey,
                        message,
                    },
                    DatabaseErrorKind::CheckViolation => StoreError::ConstraintViolation {
                        kind: ConstraintKind::Check,
                        message,
                    },
                    DatabaseErrorKind::NotNullViolation => StoreError::ConstraintViolation {
                        kind: ConstraintKind::NotNull,
                        message,
                    },
                    DatabaseErrorKind::SerializationFailure => {
                        StoreError::TransactionConflict(message)
                    }
                    // Postgres reports deadlocks (40P01), lock_timeout
                    // (55P03) and statement_timeout (57014) cancellations
                    // as plain database errors.
                    _ if message.contains("deadlock") => StoreError::TransactionConflict(message),
                    _ if message.contains("timeout") => StoreError::TransactionTimeout(message),
                    _ => StoreError::Database(message),
                }
            }
            DieselError::QueryBuilderError(err) => StoreError::Validation(err.to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for StoreError {
    fn from(err: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_error(kind: DatabaseErrorKind, message: &str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(message.to_string()))
    }

    #[test]
    fn unique_violation_is_a_constraint_violation() {
        let err = StoreError::from(db_error(
            DatabaseErrorKind::UniqueViolation,
            "duplicate key value violates unique constraint \"users_pseudo_key\"",
        ));
        assert!(matches!(
            err,
            StoreError::ConstraintViolation {
                kind: ConstraintKind::Unique,
                ..
            }
        ));
        assert!(!err.is_transient());
    }

    #[test]
    fn foreign_key_violation_is_a_constraint_violation() {
        let err = StoreError::from(db_error(
            DatabaseErrorKind::ForeignKeyViolation,
            "insert or update on table \"matches\" violates foreign key constraint",
        ));
        assert!(matches!(
            err,
            StoreError::ConstraintViolation {
                kind: ConstraintKind::ForeignKey,
                ..
            }
        ));
    }

    #[test]
    fn serialization_failure_is_transient() {
        let err = StoreError::from(db_error(
            DatabaseErrorKind::SerializationFailure,
            "could not serialize access due to concurrent update",
        ));
        assert!(matches!(err, StoreError::TransactionConflict(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn lock_timeout_is_a_transaction_timeout() {
        let err = StoreError::from(db_error(
            DatabaseErrorKind::Unknown,
            "canceling statement due to lock timeout",
        ));
        assert!(matches!(err, StoreError::TransactionTimeout(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn deadlock_is_a_transaction_conflict() {
        let err = StoreError::from(db_error(
            DatabaseErrorKind::Unknown,
            "deadlock detected",
        ));
        assert!(matches!(err, StoreError::TransactionConflict(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = StoreError::on("Tournament", DieselError::NotFound);
        assert_eq!(err.to_string(), "Tournament not found");
    }

    #[test]
    fn query_builder_errors_are_validation_errors() {
        let err = StoreError::from(DieselError::QueryBuilderError(
            "There are no changes to save.".into(),
        ));
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
