use std::path::Path;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// URL prefix uploaded files are served under.
pub const PUBLIC_PREFIX: &str = "/uploads/";

const ALLOWED: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Extension to store the file under, if `file_name` looks like an image we
/// accept.
pub fn image_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    let mime = mime_guess::from_ext(&ext).first()?;
    ALLOWED.contains(&mime.essence_str()).then_some(ext)
}

/// Whether `url` names a file served from the uploads directory. Only urls
/// handed out by [`store`] may be attached to an image in this form.
pub fn is_upload_url(url: &str) -> bool {
    url.trim_start().starts_with(PUBLIC_PREFIX)
}

/// Writes the file as `<uuid v7>.<ext>` and returns its public URL.
pub async fn store(dir: &Path, file_name: &str, data: &[u8]) -> AppResult<String> {
    let ext = image_extension(file_name).ok_or_else(|| {
        AppError::Validation(vec![
            "Only jpg, jpeg, png, gif and webp images are allowed".into(),
        ])
    })?;

    tokio::fs::create_dir_all(dir).await?;
    let stored = format!("{}.{}", Uuid::now_v7(), ext);
    tokio::fs::write(dir.join(&stored), data).await?;

    tracing::debug!("Stored upload {} ({} bytes)", stored, data.len());
    Ok(format!("{}{}", PUBLIC_PREFIX, stored))
}

/// Best effort: removes the file behind a `/uploads/<name>` URL. External
/// URLs and anything that would escape `dir` are left alone.
pub async fn remove(dir: &Path, url: &str) {
    let Some(name) = url.strip_prefix(PUBLIC_PREFIX) else {
        return;
    };
    if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') || name.starts_with('.') {
        return;
    }
    match tokio::fs::remove_file(dir.join(name)).await {
        Ok(()) => tracing::debug!("Removed upload {}", name),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove upload {}: {}", name, e),
    }
}
