use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::AppError;
use crate::models::StagedAttachment;

/// An uploaded binary payload, not yet on disk.
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Persists uploaded payloads under a configured root before any send
/// attempt, so a failed dispatch never loses the caller's files.
pub struct AttachmentStager {
    root: PathBuf,
    max_size: usize,
}

impl AttachmentStager {
    pub fn new(root: PathBuf, max_size: usize) -> Self {
        Self { root, max_size }
    }

    /// Stage a batch of uploads. The size cap is checked for the whole batch
    /// up front; an oversized file rejects the request before any bytes reach
    /// durable storage.
    pub async fn stage(&self, files: Vec<UploadedFile>) -> Result<Vec<StagedAttachment>, AppError> {
        for file in &files {
            if file.bytes.len() > self.max_size {
                return Err(AppError::Validation(format!(
                    "attachment '{}' exceeds the {} byte limit",
                    file.file_name, self.max_size
                )));
            }
        }

        if files.is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(format!("cannot create attachment dir: {e}")))?;

        let mut staged = Vec::with_capacity(files.len());
        for file in files {
            let name = format!(
                "{}-{}",
                chrono::Utc::now().timestamp_millis(),
                sanitize_file_name(&file.file_name)
            );
            let path = self.root.join(&name);

            tokio::fs::write(&path, &file.bytes)
                .await
                .map_err(|e| AppError::Internal(format!("cannot stage attachment: {e}")))?;

            tracing::debug!(file = %name, size = file.bytes.len(), "attachment staged");

            staged.push(StagedAttachment {
                file_name: file.file_name,
                content_type: file.content_type,
                size: file.bytes.len() as u64,
                path,
            });
        }

        Ok(staged)
    }

    /// Delete a staged file. A file that is already gone is not an error;
    /// release runs on cleanup paths where double deletion is routine.
    pub async fn release(&self, attachment: &StagedAttachment) -> Result<(), AppError> {
        match tokio::fs::remove_file(&attachment.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!(
                "cannot release attachment: {e}"
            ))),
        }
    }
}

/// Final path component only, with shell-hostile characters replaced.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: "application/octet-stream".to_string(),
            bytes: Bytes::copy_from_slice(bytes),
        }
    }

    #[tokio::test]
    async fn stages_and_releases_files() {
        let dir = tempfile::tempdir().unwrap();
        let stager = AttachmentStager::new(dir.path().join("uploads"), 1024);

        let staged = stager
            .stage(vec![upload("report.pdf", b"pdf bytes")])
            .await
            .unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].size, 9);
        assert!(staged[0].path.exists());
        assert!(
            staged[0]
                .path
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .ends_with("-report.pdf")
        );

        stager.release(&staged[0]).await.unwrap();
        assert!(!staged[0].path.exists());

        // Releasing a missing file is a no-op.
        stager.release(&staged[0]).await.unwrap();
    }

    #[tokio::test]
    async fn oversized_upload_rejected_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");
        let stager = AttachmentStager::new(root.clone(), 8);

        let err = stager
            .stage(vec![
                upload("small.txt", b"ok"),
                upload("big.bin", b"way too many bytes"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Nothing was written, not even the small file.
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn file_names_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");
        let stager = AttachmentStager::new(root.clone(), 1024);

        let staged = stager
            .stage(vec![upload("../../etc/passwd", b"nope")])
            .await
            .unwrap();
        assert!(staged[0].path.starts_with(&root));
        assert!(
            staged[0]
                .path
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .ends_with("-passwd")
        );
    }

    #[test]
    fn sanitize_replaces_hostile_characters() {
        assert_eq!(sanitize_file_name("a b?.txt"), "a_b_.txt");
        assert_eq!(sanitize_file_name("../../x"), "x");
        assert_eq!(sanitize_file_name(""), "attachment");
    }
}
