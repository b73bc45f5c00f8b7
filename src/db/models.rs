use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Fixed set of pin/collection categories, stored as lowercase text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Art,
    Photography,
    Travel,
    Food,
    Fashion,
    Nature,
    Design,
    Architecture,
    Technology,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Art,
        Category::Photography,
        Category::Travel,
        Category::Food,
        Category::Fashion,
        Category::Nature,
        Category::Design,
        Category::Architecture,
        Category::Technology,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Art => "art",
            Category::Photography => "photography",
            Category::Travel => "travel",
            Category::Food => "food",
            Category::Fashion => "fashion",
            Category::Nature => "nature",
            Category::Design => "design",
            Category::Architecture => "architecture",
            Category::Technology => "technology",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// What the API is allowed to show about a user. Never carries the hash;
/// the email is only shown to the user themself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: Some(user.email.clone()),
            profile_image: user.profile_image.clone(),
            bio: user.bio.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

impl PublicUser {
    /// The view other people get.
    pub fn without_email(self) -> Self {
        Self {
            email: None,
            ..self
        }
    }
}

/// Short user summary joined onto images and comments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: i64,
    pub username: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub category: Category,
    pub likes: i64,
    pub saves: i64,
    pub user_id: i64,
    pub collection_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    pub user: Author,
    /// Per-viewer, filled in by the service layer.
    pub is_liked: bool,
    pub is_saved: bool,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub category: Category,
    pub user_id: i64,
    pub collection_id: Option<i64>,
}

/// Partial update of an image. `None` keeps the stored value; for nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImagePatch {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 2048, message = "Link must be at most 2048 characters"))]
    pub link: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default, deserialize_with = "double_option")]
    pub collection_id: Option<Option<i64>>,
}

impl ImagePatch {
    /// Trims the title so a blank one fails the length check.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|title| title.trim().to_string());
        self
    }

    pub fn apply(self, image: &mut Image) {
        if let Some(title) = self.title {
            image.title = title;
        }
        if let Some(description) = self.description {
            image.description = description;
        }
        if let Some(link) = self.link {
            image.link = link;
        }
        if let Some(category) = self.category {
            image.category = category;
        }
        if let Some(collection_id) = self.collection_id {
            image.collection_id = collection_id;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub user_id: i64,
    /// Derived from both membership sources at read time.
    pub images_count: i64,
    pub cover_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewCollection {
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub user_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPatch {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<Category>,
}

impl CollectionPatch {
    pub fn apply(self, collection: &mut Collection) {
        if let Some(name) = self.name {
            collection.name = name;
        }
        if let Some(description) = self.description {
            collection.description = description;
        }
        if let Some(category) = self.category {
            collection.category = category;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub image_id: i64,
    pub created_at: String,
    pub user: Author,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default)]
    #[validate(custom(function = "validate_username"))]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub profile_image: Option<Option<String>>,
}

/// 3-30 characters of letters, digits and underscores.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    let charset_ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if (3..=30).contains(&len) && charset_ok {
        Ok(())
    } else {
        Err(ValidationError::new("username").with_message(
            "Username must be 3-30 characters of letters, numbers and underscores".into(),
        ))
    }
}

/// Tells a missing key (outer `None`, via `#[serde(default)]`) apart from an
/// explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
