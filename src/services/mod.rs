// Domain services sit between the HTTP handlers and the repositories
pub mod collections;
pub mod images;
pub mod users;

pub use collections::CollectionService;
pub use images::ImageService;
pub use users::UserService;
