pub mod password;
pub mod service;
pub mod tokens;

use thiserror::Error;

use crate::repositories::RepositoryError;

pub use service::{AuthPayload, AuthService};
pub use tokens::{Claims, TokenIssuer};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already in use")]
    EmailTaken,

    #[error("Username already taken")]
    UsernameTaken,

    /// Both an unknown email and a wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
