pub mod comments;
pub mod ranking;
pub mod repository;
pub mod validation;

use sea_orm::DbErr;
use thiserror::Error;

use validation::FieldErrors;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Failed to validate: {0}")]
    Invalid(FieldErrors),
}
