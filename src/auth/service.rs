use serde::Serialize;
use std::sync::Arc;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::tokens::TokenIssuer;
use crate::auth::AuthError;
use crate::db::models::PublicUser;
use crate::repositories::{RepositoryError, UserRepository};

/// Returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: PublicUser,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenIssuer,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenIssuer, bcrypt_cost: u32) -> Self {
        Self {
            users,
            tokens,
            bcrypt_cost,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthPayload, AuthError> {
        let email = normalize_email(email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }
        if self.users.find_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let hash = hash_password(password, self.bcrypt_cost).await?;

        // A concurrent registration can still win the race to the UNIQUE index
        let user = match self.users.insert(username, &email, &hash).await {
            Ok(user) => user,
            Err(RepositoryError::Conflict(column)) if column == "email" => {
                return Err(AuthError::EmailTaken)
            }
            Err(RepositoryError::Conflict(_)) => return Err(AuthError::UsernameTaken),
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Registered user {} ({})", user.username, user.id);
        Ok(AuthPayload {
            token: self.tokens.issue(user.id)?,
            user: PublicUser::from(&user),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, AuthError> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            tracing::debug!("Failed login for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        Ok(AuthPayload {
            token: self.tokens.issue(user.id)?,
            user: PublicUser::from(&user),
        })
    }

    /// `None` for any bad, expired or foreign token, or a user that no longer
    /// exists. Only storage failures are errors.
    pub async fn validate_token(&self, token: &str) -> Result<Option<PublicUser>, AuthError> {
        let Some(user_id) = self.tokens.verify(token) else {
            return Ok(None);
        };
        let user = self.users.find_by_id(user_id).await?;
        Ok(user.as_ref().map(PublicUser::from))
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
