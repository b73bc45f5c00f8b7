use std::sync::Arc;

use crate::auth::AuthError;
use crate::db::models::{PublicUser, UserPatch};
use crate::repositories::{RepositoryError, UserRepository};

/// Profile reads and self-service edits.
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// The email is only included when `viewer` is the user themself.
    pub async fn get_user(
        &self,
        id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<PublicUser>, RepositoryError> {
        let user = self.users.find_by_id(id).await?;
        Ok(user.as_ref().map(|user| {
            let profile = PublicUser::from(user);
            if viewer == Some(id) {
                profile
            } else {
                profile.without_email()
            }
        }))
    }

    /// `None` unless `acting_user_id` is the profile's owner.
    pub async fn update_profile(
        &self,
        id: i64,
        acting_user_id: i64,
        patch: UserPatch,
    ) -> Result<Option<PublicUser>, AuthError> {
        if id != acting_user_id {
            return Ok(None);
        }
        let Some(mut user) = self.users.find_by_id(id).await? else {
            return Ok(None);
        };

        if let Some(username) = patch.username {
            if username != user.username {
                if self.users.find_by_username(&username).await?.is_some() {
                    return Err(AuthError::UsernameTaken);
                }
                user.username = username;
            }
        }
        if let Some(bio) = patch.bio {
            user.bio = bio;
        }
        if let Some(profile_image) = patch.profile_image {
            user.profile_image = profile_image;
        }

        match self.users.update(&user).await {
            Ok(updated) => Ok(updated.as_ref().map(PublicUser::from)),
            Err(RepositoryError::Conflict(_)) => Err(AuthError::UsernameTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Self-only. Returns the urls of the images removed with the account,
    /// `None` if nothing was deleted.
    pub async fn delete_user(
        &self,
        id: i64,
        acting_user_id: i64,
    ) -> Result<Option<Vec<String>>, RepositoryError> {
        if id != acting_user_id {
            return Ok(None);
        }
        let urls = self.users.delete(id).await?;
        if let Some(urls) = &urls {
            tracing::info!("Deleted user {} and {} images", id, urls.len());
        }
        Ok(urls)
    }
}
