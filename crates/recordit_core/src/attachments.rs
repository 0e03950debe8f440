//! Review attachments stored on local disk under the upload directory.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{RecordError, Result};

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "pdf", "doc", "docx", "ppt", "pptx", "zip",
];

/// Reduce a client-supplied filename to ASCII letters, digits, `.`, `-`
/// and `_`, with no leading dots.
pub fn secure_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Lowercased suffix after the last `.` of the final path component.
pub fn extension(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let (_, ext) = base.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
    allowed: Vec<String>,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>, allowed: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            root: root.into(),
            allowed: allowed.into_iter().map(|e| e.into().to_ascii_lowercase()).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Last component of the upload directory; prefix of attachment entries
    /// in download bundles.
    pub fn dir_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "uploads".into())
    }

    pub fn allowed_file(&self, filename: &str) -> bool {
        extension(filename).is_some_and(|ext| self.allowed.iter().any(|a| *a == ext))
    }

    /// Store `bytes` under a fresh uuid name keeping the original extension.
    pub async fn save(&self, original: &str, bytes: &[u8]) -> Result<String> {
        let Some(ext) = extension(original).filter(|_| self.allowed_file(original)) else {
            return Err(RecordError::InvalidInput(format!(
                "Error in the File field - file type not allowed: {original}."
            )));
        };
        let stored = format!("{}.{ext}", Uuid::new_v4().simple());
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&stored), bytes).await?;
        tracing::debug!(file = %stored, bytes = bytes.len(), "attachment stored");
        Ok(stored)
    }

    /// Resolve a stored name to its path. Names with separators or parent
    /// references are rejected.
    pub fn path_for(&self, stored: &str) -> Result<PathBuf> {
        if stored.is_empty()
            || stored.contains(['/', '\\'])
            || stored.starts_with('.')
            || stored != secure_filename(stored)
        {
            return Err(RecordError::NotFound(format!("file {stored}")));
        }
        Ok(self.root.join(stored))
    }

    pub async fn read(&self, stored: &str) -> Result<Vec<u8>> {
        let path = self.path_for(stored)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RecordError::NotFound(format!("file {stored}")),
            _ => e.into(),
        })
    }

    pub async fn remove(&self, stored: &str) -> Result<()> {
        let path = self.path_for(stored)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_filename_strips_paths_and_oddities() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("My Slides (1).pptx"), "My_Slides_1.pptx");
        assert_eq!(secure_filename("..hidden.png"), "hidden.png");
        assert_eq!(secure_filename("报告.pdf"), "pdf");
        assert_eq!(secure_filename(r"C:\tmp\a.doc"), "a.doc");
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension("A.PNG").as_deref(), Some("png"));
        assert_eq!(extension("noext"), None);
        assert_eq!(extension("trailing."), None);
        assert_eq!(extension("报告.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension("v1.0/readme"), None);
    }

    #[test]
    fn allowed_file_checks_extension() {
        let store = AttachmentStore::new("/tmp/x", DEFAULT_EXTENSIONS.iter().copied());
        assert!(store.allowed_file("slides.PDF"));
        assert!(!store.allowed_file("run.exe"));
        assert!(!store.allowed_file("pdf"));
        assert!(store.allowed_file("报告.pdf"));
        assert!(store.allowed_file("第一周 汇报.pptx"));
    }

    #[test]
    fn path_for_rejects_traversal() {
        let store = AttachmentStore::new("/srv/uploads", ["png"]);
        assert!(store.path_for("../secret").is_err());
        assert!(store.path_for(".env").is_err());
        assert!(store.path_for("a/b.png").is_err());
        assert_eq!(
            store.path_for("abc.png").unwrap(),
            PathBuf::from("/srv/uploads/abc.png")
        );
        assert_eq!(store.dir_name(), "uploads");
    }

    #[tokio::test]
    async fn save_read_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(tmp.path().join("uploads"), ["png"]);
        let stored = store.save("shot.PNG", b"img").await.unwrap();
        assert!(stored.ends_with(".png"));
        assert_eq!(stored.len(), 32 + 4);
        assert_eq!(store.read(&stored).await.unwrap(), b"img");
        store.remove(&stored).await.unwrap();
        assert!(matches!(
            store.read(&stored).await,
            Err(RecordError::NotFound(_))
        ));
        assert!(store.save("evil.exe", b"x").await.is_err());
    }

    #[tokio::test]
    async fn save_keeps_extension_of_cjk_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(tmp.path(), ["pdf"]);
        let stored = store.save("报告.pdf", b"%PDF").await.unwrap();
        assert!(stored.ends_with(".pdf"));
        assert_eq!(store.read(&stored).await.unwrap(), b"%PDF");
    }
}
