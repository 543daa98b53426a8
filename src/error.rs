use thiserror::Error;
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

/// Failures surfaced by the record store and the report composer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{collection} record {id} not found")]
    NotFound { collection: &'static str, id: Uuid },
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(collection: &'static str, id: Uuid) -> Self {
        Self::NotFound { collection, id }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_check_violation() {
                return Self::Validation(db_err.message().to_string());
            }
        }
        Self::StoreUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_collection_and_id() {
        let id = Uuid::nil();
        let msg = AppError::not_found("income", id).to_string();
        assert_eq!(
            msg,
            "income record 00000000-0000-0000-0000-000000000000 not found"
        );
    }

    #[test]
    fn pool_errors_map_to_store_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }
}
