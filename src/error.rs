#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("SQL Error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Missing column: {0}")]
    MissingColumn(String),
    #[error("Invalid table name: '{0}'")]
    InvalidTableName(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
