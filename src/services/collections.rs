use std::sync::Arc;

use crate::db::models::{Collection, CollectionPatch, NewCollection};
use crate::pagination::{Page, PageRequest};
use crate::repositories::{CollectionRepository, RepositoryError};

pub struct CollectionService {
    collections: Arc<dyn CollectionRepository>,
}

impl CollectionService {
    pub fn new(collections: Arc<dyn CollectionRepository>) -> Self {
        Self { collections }
    }

    pub async fn get_collections(
        &self,
        request: PageRequest,
        owner: Option<i64>,
    ) -> Result<Page<Collection>, RepositoryError> {
        let (collections, total) = self.collections.list(owner, request).await?;
        Ok(Page::new(collections, total, request))
    }

    pub async fn get_user_collections(
        &self,
        user_id: i64,
    ) -> Result<Vec<Collection>, RepositoryError> {
        self.collections.list_by_user(user_id).await
    }

    pub async fn get_collection_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Collection>, RepositoryError> {
        self.collections.find_by_id(id).await
    }

    pub async fn create_collection(
        &self,
        collection: NewCollection,
    ) -> Result<Collection, RepositoryError> {
        let created = self.collections.insert(&collection).await?;
        tracing::info!(
            "User {} created collection {} ({})",
            created.user_id,
            created.id,
            created.name
        );
        Ok(created)
    }

    /// `None` when the collection is missing or owned by someone else.
    pub async fn update_collection(
        &self,
        id: i64,
        user_id: i64,
        patch: CollectionPatch,
    ) -> Result<Option<Collection>, RepositoryError> {
        let Some(mut collection) = self
            .collections
            .find_by_id(id)
            .await?
            .filter(|c| c.user_id == user_id)
        else {
            return Ok(None);
        };
        patch.apply(&mut collection);
        self.collections.update(&collection).await
    }

    pub async fn delete_collection(&self, id: i64, user_id: i64) -> Result<bool, RepositoryError> {
        let owned = self
            .collections
            .find_by_id(id)
            .await?
            .is_some_and(|c| c.user_id == user_id);
        if !owned {
            return Ok(false);
        }
        let deleted = self.collections.delete(id).await?;
        if deleted {
            tracing::info!("User {} deleted collection {}", user_id, id);
        }
        Ok(deleted)
    }
}
