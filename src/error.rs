use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("invalid number of inserted rows: {0}")]
    Insert(usize),

    #[error("username '{0}' is already taken")]
    Duplicate(String),

    #[error("player {0} does not exist")]
    UnknownPlayer(i32),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Rejected client input. Raised before anything reaches the game logic.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("difficulty must be at least 1, got {0}")]
    Difficulty(i32),

    #[error("level must not be negative, got {0}")]
    Level(i32),

    #[error("time must be a finite number of seconds")]
    Time,

    #[error("wpm must be a finite, non-negative number")]
    Wpm,

    #[error("accuracy must lie between 0 and 100")]
    Accuracy,

    #[error("{0} must not be negative")]
    Negative(&'static str),

    #[error("phrase must have at least {0} characters")]
    PhraseTooShort(usize),

    #[error("unknown role '{0}', expected 'professor' or 'aluno'")]
    Role(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("client timeout ({timeout}s) must be longer than the heartbeat interval ({interval}s)")]
    Heartbeat { interval: u64, timeout: u64 },

    #[error("heartbeat interval must be at least one second")]
    ZeroInterval,
}

/// Failures surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed request body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("not authenticated")]
    Unauthenticated,

    #[error("only teachers may manage phrases")]
    Forbidden,

    #[error("phrase {0} not found")]
    NotFound(i32),

    #[error("background task failed")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Malformed(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Store(e) => {
                error!("store failure: {}", e);
                "storage failure".to_owned()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": message,
        }))
    }
}
