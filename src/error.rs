use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerwiseError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not a valid bank statement: {0}")]
    Parse(String),

    #[error("No transactions found in statement")]
    NoTransactionsFound,

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, LedgerwiseError>;
