use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::tokens::generate_secret;
use crate::auth::{AuthService, TokenIssuer};
use crate::config::Config;
use crate::repositories::{
    SqliteCollectionRepository, SqliteCommentRepository, SqliteImageRepository,
    SqliteLikeRepository, SqliteSaveRepository, SqliteUserRepository,
};
use crate::services::{CollectionService, ImageService, UserService};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub auth: Arc<AuthService>,
    pub images: Arc<ImageService>,
    pub collections: Arc<CollectionService>,
    pub users: Arc<UserService>,
}

impl AppState {
    /// Wires every repository and service onto one pool.
    pub fn new(db: DbPool, config: Config) -> Self {
        let users = Arc::new(SqliteUserRepository::new(db.clone()));
        let images = Arc::new(SqliteImageRepository::new(db.clone()));
        let collections = Arc::new(SqliteCollectionRepository::new(db.clone()));

        let secret = match config.auth.jwt_secret.clone() {
            Some(secret) => secret,
            None => {
                tracing::warn!(
                    "No JWT secret configured; using a random one. Tokens will not survive a restart"
                );
                generate_secret()
            }
        };
        let tokens = TokenIssuer::new(&secret, config.auth.token_ttl_days);

        let auth = AuthService::new(users.clone(), tokens, config.auth.bcrypt_cost);
        let image_service = ImageService::new(
            images,
            Arc::new(SqliteLikeRepository::new(db.clone())),
            Arc::new(SqliteSaveRepository::new(db.clone())),
            Arc::new(SqliteCommentRepository::new(db.clone())),
            collections.clone(),
        );

        Self {
            auth: Arc::new(auth),
            images: Arc::new(image_service),
            collections: Arc::new(CollectionService::new(collections)),
            users: Arc::new(UserService::new(users)),
            config,
        }
    }
}
