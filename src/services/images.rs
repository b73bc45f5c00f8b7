use std::sync::Arc;

use crate::db::models::{Category, Comment, Image, ImagePatch, NewImage};
use crate::pagination::{Page, PageRequest};
use crate::repositories::{
    CollectionRepository, CommentRepository, ImageFilter, ImageOrder, ImageRepository,
    LikeRepository, RepositoryError, SaveRepository,
};

/// Pin lifecycle: listings with per-viewer flags, owner-gated edits, likes,
/// saves and comments.
///
/// Absence and "not yours" are both reported as `None` (or `false`); callers
/// branch on that rather than on an error.
pub struct ImageService {
    images: Arc<dyn ImageRepository>,
    likes: Arc<dyn LikeRepository>,
    saves: Arc<dyn SaveRepository>,
    comments: Arc<dyn CommentRepository>,
    collections: Arc<dyn CollectionRepository>,
}

impl ImageService {
    pub fn new(
        images: Arc<dyn ImageRepository>,
        likes: Arc<dyn LikeRepository>,
        saves: Arc<dyn SaveRepository>,
        comments: Arc<dyn CommentRepository>,
        collections: Arc<dyn CollectionRepository>,
    ) -> Self {
        Self {
            images,
            likes,
            saves,
            comments,
            collections,
        }
    }

    /// Fills `is_liked`/`is_saved` for the viewer, one lookup pair per image.
    async fn enrich(&self, mut image: Image, viewer: Option<i64>) -> Result<Image, RepositoryError> {
        if let Some(user_id) = viewer {
            image.is_liked = self.likes.exists(user_id, image.id).await?;
            image.is_saved = self.saves.is_saved(user_id, image.id).await?;
        }
        Ok(image)
    }

    async fn enrich_all(
        &self,
        images: Vec<Image>,
        viewer: Option<i64>,
    ) -> Result<Vec<Image>, RepositoryError> {
        let mut enriched = Vec::with_capacity(images.len());
        for image in images {
            enriched.push(self.enrich(image, viewer).await?);
        }
        Ok(enriched)
    }

    async fn page(
        &self,
        filter: ImageFilter,
        order: ImageOrder,
        request: PageRequest,
        viewer: Option<i64>,
    ) -> Result<Page<Image>, RepositoryError> {
        let (images, total) = self.images.list(&filter, order, request).await?;
        let images = self.enrich_all(images, viewer).await?;
        Ok(Page::new(images, total, request))
    }

    async fn owns_collection(
        &self,
        collection_id: i64,
        user_id: i64,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .collections
            .find_by_id(collection_id)
            .await?
            .is_some_and(|c| c.user_id == user_id))
    }

    /// The image, if it exists and belongs to `user_id`.
    async fn owned(&self, id: i64, user_id: i64) -> Result<Option<Image>, RepositoryError> {
        Ok(self
            .images
            .find_by_id(id)
            .await?
            .filter(|image| image.user_id == user_id))
    }

    pub async fn get_images(
        &self,
        request: PageRequest,
        category: Option<Category>,
        search: Option<String>,
        viewer: Option<i64>,
    ) -> Result<Page<Image>, RepositoryError> {
        let filter = ImageFilter {
            category,
            search,
            user_id: None,
        };
        self.page(filter, ImageOrder::Newest, request, viewer).await
    }

    pub async fn get_popular_images(
        &self,
        request: PageRequest,
        viewer: Option<i64>,
    ) -> Result<Page<Image>, RepositoryError> {
        self.page(ImageFilter::default(), ImageOrder::Popular, request, viewer)
            .await
    }

    pub async fn get_user_images(
        &self,
        user_id: i64,
        request: PageRequest,
        viewer: Option<i64>,
    ) -> Result<Page<Image>, RepositoryError> {
        let filter = ImageFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        self.page(filter, ImageOrder::Newest, request, viewer).await
    }

    /// Members of a collection, newest first. `None` if the collection is gone.
    pub async fn get_collection_images(
        &self,
        collection_id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<Vec<Image>>, RepositoryError> {
        if self.collections.find_by_id(collection_id).await?.is_none() {
            return Ok(None);
        }
        let images = self.images.list_in_collection(collection_id).await?;
        Ok(Some(self.enrich_all(images, viewer).await?))
    }

    pub async fn get_image_by_id(
        &self,
        id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<Image>, RepositoryError> {
        match self.images.find_by_id(id).await? {
            Some(image) => Ok(Some(self.enrich(image, viewer).await?)),
            None => Ok(None),
        }
    }

    /// Counters start at zero. `None` when `collection_id` names a collection
    /// the uploader does not own.
    pub async fn create_image(&self, image: NewImage) -> Result<Option<Image>, RepositoryError> {
        if let Some(collection_id) = image.collection_id {
            if !self.owns_collection(collection_id, image.user_id).await? {
                return Ok(None);
            }
        }
        let created = self.images.insert(&image).await?;
        tracing::info!("User {} created image {}", created.user_id, created.id);
        Ok(Some(created))
    }

    pub async fn update_image(
        &self,
        id: i64,
        user_id: i64,
        patch: ImagePatch,
    ) -> Result<Option<Image>, RepositoryError> {
        let Some(mut image) = self.owned(id, user_id).await? else {
            return Ok(None);
        };
        if let Some(Some(collection_id)) = patch.collection_id {
            if !self.owns_collection(collection_id, user_id).await? {
                return Ok(None);
            }
        }

        patch.apply(&mut image);
        match self.images.update(&image).await? {
            Some(updated) => Ok(Some(self.enrich(updated, Some(user_id)).await?)),
            None => Ok(None),
        }
    }

    pub async fn delete_image(&self, id: i64, user_id: i64) -> Result<bool, RepositoryError> {
        if self.owned(id, user_id).await?.is_none() {
            return Ok(false);
        }
        let deleted = self.images.delete(id).await?;
        if deleted {
            tracing::info!("User {} deleted image {}", user_id, id);
        }
        Ok(deleted)
    }

    /// Idempotent: liking twice counts once. Returns the refreshed image.
    pub async fn like_image(
        &self,
        image_id: i64,
        user_id: i64,
    ) -> Result<Option<Image>, RepositoryError> {
        if self.images.find_by_id(image_id).await?.is_none() {
            return Ok(None);
        }
        self.likes.like(user_id, image_id).await?;
        self.get_image_by_id(image_id, Some(user_id)).await
    }

    /// Idempotent: unliking without a like changes nothing.
    pub async fn unlike_image(
        &self,
        image_id: i64,
        user_id: i64,
    ) -> Result<Option<Image>, RepositoryError> {
        if self.images.find_by_id(image_id).await?.is_none() {
            return Ok(None);
        }
        self.likes.unlike(user_id, image_id).await?;
        self.get_image_by_id(image_id, Some(user_id)).await
    }

    /// `None` when the image is missing or the collection is not the caller's.
    pub async fn save_image(
        &self,
        image_id: i64,
        user_id: i64,
        collection_id: i64,
    ) -> Result<Option<Image>, RepositoryError> {
        if self.images.find_by_id(image_id).await?.is_none() {
            return Ok(None);
        }
        if !self.owns_collection(collection_id, user_id).await? {
            return Ok(None);
        }
        self.saves.save(user_id, image_id, collection_id).await?;
        self.get_image_by_id(image_id, Some(user_id)).await
    }

    pub async fn unsave_image(
        &self,
        image_id: i64,
        user_id: i64,
    ) -> Result<Option<Image>, RepositoryError> {
        if self.images.find_by_id(image_id).await?.is_none() {
            return Ok(None);
        }
        self.saves.unsave(user_id, image_id).await?;
        self.get_image_by_id(image_id, Some(user_id)).await
    }

    /// Newest first. `None` if the image does not exist.
    pub async fn get_comments(&self, image_id: i64) -> Result<Option<Vec<Comment>>, RepositoryError> {
        if self.images.find_by_id(image_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.comments.list_for_image(image_id).await?))
    }

    /// Reads the new comment back through the joined query so `user` is set.
    pub async fn add_comment(
        &self,
        image_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Option<Comment>, RepositoryError> {
        if self.images.find_by_id(image_id).await?.is_none() {
            return Ok(None);
        }
        let id = self.comments.insert(image_id, user_id, content).await?;
        self.comments.find_by_id(id).await
    }

    /// Allowed for the comment's author and for the owner of the image.
    pub async fn delete_comment(
        &self,
        image_id: i64,
        comment_id: i64,
        user_id: i64,
    ) -> Result<bool, RepositoryError> {
        let Some(comment) = self.comments.find_by_id(comment_id).await? else {
            return Ok(false);
        };
        if comment.image_id != image_id {
            return Ok(false);
        }
        let image_owner = self
            .images
            .find_by_id(image_id)
            .await?
            .map(|image| image.user_id);
        if comment.user_id != user_id && image_owner != Some(user_id) {
            return Ok(false);
        }
        self.comments.delete(comment_id).await
    }
}
