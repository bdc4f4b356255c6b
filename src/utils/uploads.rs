use std::path::{Path, PathBuf};

/// Largest accepted course resource.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Resolves the configured uploads directory against the working directory.
pub fn get_uploads_dir(configured: &str) -> std::io::Result<PathBuf> {
    let path = Path::new(configured);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path))
}

/// Course resources are documents, pictures or videos.
pub fn is_allowed_content_type(content_type: &str) -> bool {
    content_type.starts_with("application/pdf")
        || content_type.starts_with("image/")
        || content_type.starts_with("video/")
}

/// Unique on-disk name that keeps a readable tail of the original name.
pub fn stored_file_name(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple(),
        cleaned
    )
}

pub async fn save_upload(dir: &Path, stored_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(stored_name);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_documents_pictures_and_videos_pass() {
        assert!(is_allowed_content_type("application/pdf"));
        assert!(is_allowed_content_type("image/png"));
        assert!(is_allowed_content_type("video/mp4"));
        assert!(!is_allowed_content_type("application/x-msdownload"));
        assert!(!is_allowed_content_type("text/html"));
    }

    #[test]
    fn stored_name_drops_directories_and_odd_characters() {
        let name = stored_file_name("../../etc/pass wd?.pdf");
        assert!(name.ends_with("-pass_wd_.pdf"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn relative_dir_is_resolved_from_cwd() {
        let dir = get_uploads_dir("uploads").unwrap();
        assert!(dir.is_absolute());
        assert!(dir.ends_with("uploads"));
    }

    #[tokio::test]
    async fn save_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested");
        let path = save_upload(&dir, "a.pdf", b"%PDF-1.4").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4");
    }
}
