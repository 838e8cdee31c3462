pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Unique constraint violated on {0}")]
    UniqueViolation(String),

    #[error("Invalid sort direction: {0}")]
    InvalidSortDirection(String),
}

impl Error {
    /// Keeps unique violations distinguishable from other store failures.
    pub(crate) fn from_db(entity: &str, error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
                Error::UniqueViolation(entity.to_string())
            }
            _ => Error::DatabaseError(error),
        }
    }
}
